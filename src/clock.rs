// Injectable date provider
//
// Every "today" check in the processors goes through this trait so that
// late-fee and expiry logic is deterministic under test.

use chrono::{Local, NaiveDate};

pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Reads the local system date. The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to a fixed date. Used by tests and backfill tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl FixedClock {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        FixedClock(
            NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date"),
        )
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
