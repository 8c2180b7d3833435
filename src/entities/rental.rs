// Rental transaction and fee rows
//
// A transaction is "open" while it has no return date; the return processor
// sets the return date exactly once, at close. Fee rows are written at
// return time and never mutated afterwards (the store exposes no update
// path for them).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Open,
    Closed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Open => "open",
            TxStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Result<TxStatus, ParseEnumError> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TxStatus::Open),
            "closed" => Ok(TxStatus::Closed),
            other => Err(ParseEnumError::new("transaction status", other)),
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalTransaction {
    pub id: i64,
    pub bicycle_id: i64,
    pub member_id: i64,
    pub checkout_date: NaiveDate,
    /// Always derived as checkout date + rental period, never set directly.
    pub due_date: NaiveDate,
    /// None while the rental is open.
    pub return_date: Option<NaiveDate>,
    pub status: TxStatus,
}

impl RentalTransaction {
    pub fn is_open(&self) -> bool {
        self.status == TxStatus::Open
    }

    /// Days past due as of `on`; zero or negative means on time.
    pub fn days_late(&self, on: NaiveDate) -> i64 {
        (on - self.due_date).num_days()
    }
}

// ============================================================================
// FEES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    Late,
    Damage,
}

impl FeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::Late => "late",
            FeeType::Damage => "damage",
        }
    }

    pub fn parse(s: &str) -> Result<FeeType, ParseEnumError> {
        match s.trim().to_lowercase().as_str() {
            "late" => Ok(FeeType::Late),
            "damage" => Ok(FeeType::Damage),
            other => Err(ParseEnumError::new("fee type", other)),
        }
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub id: i64,
    pub transaction_id: i64,
    pub fee_type: FeeType,
    pub amount: f64,
    pub note: String,
}

/// Outcome of a completed return: the closed transaction plus any fees
/// charged. An empty fee list is the normal on-time, undamaged case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnReceipt {
    pub transaction: RentalTransaction,
    pub fees: Vec<Fee>,
}

impl ReturnReceipt {
    pub fn total_fees(&self) -> f64 {
        self.fees.iter().map(|f| f.amount).sum()
    }
}
