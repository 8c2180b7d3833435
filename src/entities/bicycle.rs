// Bicycle inventory row
//
// Status invariant maintained by the processors: a bike is Rented exactly
// when one open rental transaction references it, and Available only when
// no open transaction does.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ParseEnumError;

// ============================================================================
// CONDITION
// ============================================================================

/// Physical condition of a bike.
///
/// Declaration order is the severity order: `Excellent < Good < Fair <
/// Damaged`. The return processor charges damage fees off the number of
/// severity steps a bike degraded while out, so the derived `Ord` is part
/// of the contract here.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Damaged,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Damaged => "damaged",
        }
    }

    pub fn parse(s: &str) -> Result<Condition, ParseEnumError> {
        match s.trim().to_lowercase().as_str() {
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "damaged" => Ok(Condition::Damaged),
            other => Err(ParseEnumError::new("condition", other)),
        }
    }

    /// Position in the severity ordering, 0 (excellent) to 3 (damaged).
    pub fn severity(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BikeStatus {
    Available,
    Rented,
    Maintenance,
}

impl BikeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BikeStatus::Available => "available",
            BikeStatus::Rented => "rented",
            BikeStatus::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Result<BikeStatus, ParseEnumError> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(BikeStatus::Available),
            "rented" => Ok(BikeStatus::Rented),
            "maintenance" => Ok(BikeStatus::Maintenance),
            other => Err(ParseEnumError::new("status", other)),
        }
    }
}

impl fmt::Display for BikeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// BICYCLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bicycle {
    pub id: i64,
    pub brand: String,
    pub bike_type: String,
    pub frame_size: String,
    /// Daily rental rate.
    pub rental_rate: f64,
    pub purchase_date: NaiveDate,
    pub condition: Condition,
    pub status: BikeStatus,
}

impl Bicycle {
    pub fn is_available(&self) -> bool {
        self.status == BikeStatus::Available
    }
}
