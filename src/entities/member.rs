// Member eligibility row

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    /// Maximum number of concurrent open rentals.
    pub rental_limit: u32,
    /// Last day the membership is valid. Rentals are allowed on this day.
    pub membership_end: NaiveDate,
}

impl Member {
    /// A membership permits new rentals while its end date has not passed.
    pub fn is_active(&self, on: NaiveDate) -> bool {
        self.membership_end >= on
    }
}
