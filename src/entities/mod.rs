// Domain rows backed by the persistence store
//
// These are the mutable "current state" records the processors
// read-modify-write under the single-writer assumption.

pub mod bicycle;
pub mod member;
pub mod rental;

pub use bicycle::{Bicycle, BikeStatus, Condition};
pub use member::Member;
pub use rental::{Fee, FeeType, RentalTransaction, ReturnReceipt, TxStatus};

use thiserror::Error;

/// Raised when a stored or user-supplied string does not name a known
/// enum variant (condition, status, fee type, sort key).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        ParseEnumError {
            kind,
            value: value.to_string(),
        }
    }
}
