// Typed error surface for the rental operations
//
// NotFound and policy violations are expected business outcomes; callers
// match on them. Persistence failures wrap the underlying store error and
// abort the enclosing store transaction.

use chrono::NaiveDate;
use thiserror::Error;

use crate::entities::bicycle::BikeStatus;
use crate::entities::ParseEnumError;

#[derive(Debug, Error)]
pub enum RentalError {
    #[error("member {0} not found")]
    MemberNotFound(i64),

    #[error("bicycle {0} not found")]
    BicycleNotFound(i64),

    /// Also raised when the transaction exists but is already closed:
    /// a closed rental can no longer be returned.
    #[error("rental transaction {0} not found or already closed")]
    TransactionNotFound(i64),

    #[error("membership for member {member} expired on {end_date}")]
    MembershipExpired { member: i64, end_date: NaiveDate },

    #[error("member {member} is at their rental limit ({limit} open rentals)")]
    RentalLimitExceeded { member: i64, limit: u32 },

    #[error("bicycle {bicycle} is not available for rent (status: {status})")]
    BicycleUnavailable { bicycle: i64, status: BikeStatus },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl From<ParseEnumError> for RentalError {
    fn from(err: ParseEnumError) -> Self {
        RentalError::InvalidQuery(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
