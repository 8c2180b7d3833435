// Seed-data import
//
// Loads the shop's flat inventory and membership files into the store.
// The inventory file is pipe-delimited with messy legacy fields: rates
// like "$12/day;80/week", dates in d/m/Y, condition labels that predate
// the current vocabulary. Cleanup here is lenient; rows that cannot be
// salvaged are skipped with a warning rather than failing the import.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::db;
use crate::entities::{Bicycle, BikeStatus, Condition, Member};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    /// Rows whose id already existed in the store.
    pub skipped_existing: usize,
    /// Rows dropped during cleanup.
    pub skipped_invalid: usize,
}

#[derive(Debug, Deserialize)]
struct RawBicycle {
    #[serde(rename = "ID")]
    id: i64,
    #[serde(rename = "Brand")]
    brand: String,
    #[serde(rename = "Type")]
    bike_type: String,
    #[serde(rename = "Frame Size")]
    frame_size: String,
    #[serde(rename = "Rental Rate")]
    rental_rate: String,
    #[serde(rename = "Purchase Date")]
    purchase_date: String,
    #[serde(rename = "Condition")]
    condition: String,
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(rename = "MemberID")]
    id: i64,
    #[serde(rename = "RentalLimit")]
    rental_limit: u32,
    #[serde(rename = "MembershipEndDate")]
    membership_end: String,
}

/// Load bicycles from a pipe-delimited inventory file. Idempotent: rows
/// whose id is already present are left untouched.
pub fn load_bicycles<P: AsRef<Path>>(conn: &Connection, path: P) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .trim(csv::Trim::All)
        .from_path(path.as_ref())
        .with_context(|| format!("Failed to open inventory file: {:?}", path.as_ref()))?;

    let mut summary = ImportSummary::default();

    for record in rdr.deserialize() {
        let raw: RawBicycle = record.context("Failed to deserialize inventory row")?;

        let Some(purchase_date) = clean_date(&raw.purchase_date) else {
            warn!(id = raw.id, raw = %raw.purchase_date, "skipping bike with unparseable purchase date");
            summary.skipped_invalid += 1;
            continue;
        };

        let bike = Bicycle {
            id: raw.id,
            brand: raw.brand,
            bike_type: raw.bike_type.to_lowercase(),
            frame_size: raw.frame_size,
            rental_rate: clean_rate(&raw.rental_rate),
            purchase_date,
            condition: clean_condition(&raw.condition),
            status: clean_status(&raw.status),
        };

        if db::insert_bicycle_if_absent(conn, &bike)? {
            summary.inserted += 1;
        } else {
            summary.skipped_existing += 1;
        }
    }

    info!(
        inserted = summary.inserted,
        skipped_existing = summary.skipped_existing,
        skipped_invalid = summary.skipped_invalid,
        "inventory import finished"
    );

    Ok(summary)
}

/// Load members from a comma-delimited membership file. Existing rows are
/// replaced: the membership file is authoritative.
pub fn load_members<P: AsRef<Path>>(conn: &Connection, path: P) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path.as_ref())
        .with_context(|| format!("Failed to open membership file: {:?}", path.as_ref()))?;

    let mut loaded = 0;

    for record in rdr.deserialize() {
        let raw: RawMember = record.context("Failed to deserialize membership row")?;

        let Some(membership_end) = clean_date(&raw.membership_end) else {
            warn!(id = raw.id, raw = %raw.membership_end, "skipping member with unparseable end date");
            continue;
        };

        db::upsert_member(
            conn,
            &Member {
                id: raw.id,
                rental_limit: raw.rental_limit,
                membership_end,
            },
        )?;
        loaded += 1;
    }

    info!(loaded, "membership import finished");

    Ok(loaded)
}

// ============================================================================
// FIELD CLEANUP
// ============================================================================

/// Accepts ISO (2024-05-01) or legacy day-first (01/05/2024) dates.
fn clean_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.parse::<NaiveDate>()
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}

/// Daily rate out of strings like "$12/day;80/week" or "12/day".
/// Unparseable rates become 0.0 so the row still imports.
fn clean_rate(raw: &str) -> f64 {
    let daily = raw.split(';').next().unwrap_or("");
    let cleaned = daily
        .trim()
        .trim_start_matches('$')
        .trim_end_matches("/day")
        .trim();

    match cleaned.parse::<f64>() {
        Ok(rate) => rate,
        Err(_) => {
            if !cleaned.eq_ignore_ascii_case("missing") {
                warn!(raw, "unparseable rental rate, defaulting to 0.0");
            }
            0.0
        }
    }
}

/// Legacy files say "New" for a pristine bike and "Poor" for a worn one.
fn clean_condition(raw: &str) -> Condition {
    Condition::parse(raw).unwrap_or_else(|_| match raw.trim().to_lowercase().as_str() {
        "new" => Condition::Excellent,
        "poor" => Condition::Fair,
        _ => {
            warn!(raw, "unknown condition label, defaulting to good");
            Condition::Good
        }
    })
}

fn clean_status(raw: &str) -> BikeStatus {
    BikeStatus::parse(raw).unwrap_or_else(|_| {
        if raw.trim().to_lowercase().contains("maintenance") {
            BikeStatus::Maintenance
        } else {
            warn!(raw, "unknown status label, defaulting to available");
            BikeStatus::Available
        }
    })
}
