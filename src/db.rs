// SQLite persistence store
//
// Schema setup, row mapping, and the read/write helpers the processors
// compose inside their transaction scopes. Every statement is
// parameterized; no user input is ever spliced into SQL text.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::entities::{
    Bicycle, BikeStatus, Condition, Fee, FeeType, Member, ParseEnumError, RentalTransaction,
    TxStatus,
};
use crate::error::Result;

pub(crate) const BICYCLE_COLS: &str =
    "id, brand, bike_type, frame_size, rental_rate, purchase_date, condition, status";

const TX_COLS: &str = "id, bicycle_id, member_id, checkout_date, due_date, return_date, status";

// ============================================================================
// SETUP
// ============================================================================

/// Open (or create) a file-backed store and ensure the schema exists.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

/// In-memory store with the full schema. Used by tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery on file-backed stores
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bicycles (
            id INTEGER PRIMARY KEY,
            brand TEXT NOT NULL,
            bike_type TEXT NOT NULL,
            frame_size TEXT NOT NULL,
            rental_rate REAL NOT NULL,
            purchase_date TEXT NOT NULL,
            condition TEXT NOT NULL DEFAULT 'good'
                CHECK(condition IN ('excellent', 'good', 'fair', 'damaged')),
            status TEXT NOT NULL DEFAULT 'available'
                CHECK(status IN ('available', 'rented', 'maintenance'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY,
            rental_limit INTEGER NOT NULL,
            membership_end TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rental_transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bicycle_id INTEGER NOT NULL REFERENCES bicycles(id),
            member_id INTEGER NOT NULL REFERENCES members(id),
            checkout_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            status TEXT NOT NULL DEFAULT 'open'
                CHECK(status IN ('open', 'closed'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rental_fees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER NOT NULL REFERENCES rental_transactions(id),
            fee_type TEXT NOT NULL CHECK(fee_type IN ('late', 'damage')),
            amount REAL NOT NULL,
            note TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_member_status
         ON rental_transactions(member_id, status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tx_bicycle_status
         ON rental_transactions(bicycle_id, status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_fees_transaction
         ON rental_fees(transaction_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bicycles_status ON bicycles(status)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn date_value(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    raw.parse::<NaiveDate>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn enum_value<T>(
    idx: usize,
    parsed: std::result::Result<T, ParseEnumError>,
) -> rusqlite::Result<T> {
    parsed.map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn bicycle_from_row(row: &Row<'_>) -> rusqlite::Result<Bicycle> {
    let purchase_date: String = row.get(5)?;
    let condition: String = row.get(6)?;
    let status: String = row.get(7)?;

    Ok(Bicycle {
        id: row.get(0)?,
        brand: row.get(1)?,
        bike_type: row.get(2)?,
        frame_size: row.get(3)?,
        rental_rate: row.get(4)?,
        purchase_date: date_value(5, purchase_date)?,
        condition: enum_value(6, Condition::parse(&condition))?,
        status: enum_value(7, BikeStatus::parse(&status))?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    let membership_end: String = row.get(2)?;

    Ok(Member {
        id: row.get(0)?,
        rental_limit: row.get(1)?,
        membership_end: date_value(2, membership_end)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<RentalTransaction> {
    let checkout_date: String = row.get(3)?;
    let due_date: String = row.get(4)?;
    let return_date: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;

    Ok(RentalTransaction {
        id: row.get(0)?,
        bicycle_id: row.get(1)?,
        member_id: row.get(2)?,
        checkout_date: date_value(3, checkout_date)?,
        due_date: date_value(4, due_date)?,
        return_date: return_date.map(|d| date_value(5, d)).transpose()?,
        status: enum_value(6, TxStatus::parse(&status))?,
    })
}

fn fee_from_row(row: &Row<'_>) -> rusqlite::Result<Fee> {
    let fee_type: String = row.get(2)?;

    Ok(Fee {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        fee_type: enum_value(2, FeeType::parse(&fee_type))?,
        amount: row.get(3)?,
        note: row.get(4)?,
    })
}

// ============================================================================
// BICYCLES
// ============================================================================

pub fn insert_bicycle(conn: &Connection, bike: &Bicycle) -> Result<()> {
    conn.execute(
        "INSERT INTO bicycles (id, brand, bike_type, frame_size, rental_rate,
                               purchase_date, condition, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            bike.id,
            bike.brand,
            bike.bike_type,
            bike.frame_size,
            bike.rental_rate,
            bike.purchase_date.to_string(),
            bike.condition.as_str(),
            bike.status.as_str(),
        ],
    )?;

    Ok(())
}

/// Idempotent insert used by the seed importer. Returns true when the row
/// was actually inserted, false when a bike with that id already existed.
pub fn insert_bicycle_if_absent(conn: &Connection, bike: &Bicycle) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO bicycles (id, brand, bike_type, frame_size, rental_rate,
                                         purchase_date, condition, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            bike.id,
            bike.brand,
            bike.bike_type,
            bike.frame_size,
            bike.rental_rate,
            bike.purchase_date.to_string(),
            bike.condition.as_str(),
            bike.status.as_str(),
        ],
    )?;

    Ok(changed > 0)
}

pub fn get_bicycle(conn: &Connection, id: i64) -> Result<Option<Bicycle>> {
    let bike = conn
        .query_row(
            &format!("SELECT {BICYCLE_COLS} FROM bicycles WHERE id = ?1"),
            params![id],
            bicycle_from_row,
        )
        .optional()?;

    Ok(bike)
}

pub fn count_bicycles(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM bicycles", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// MEMBERS
// ============================================================================

pub fn insert_member(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members (id, rental_limit, membership_end) VALUES (?1, ?2, ?3)",
        params![
            member.id,
            member.rental_limit,
            member.membership_end.to_string(),
        ],
    )?;

    Ok(())
}

/// Membership files are re-imported wholesale, so member rows replace.
pub fn upsert_member(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO members (id, rental_limit, membership_end)
         VALUES (?1, ?2, ?3)",
        params![
            member.id,
            member.rental_limit,
            member.membership_end.to_string(),
        ],
    )?;

    Ok(())
}

pub fn get_member(conn: &Connection, id: i64) -> Result<Option<Member>> {
    let member = conn
        .query_row(
            "SELECT id, rental_limit, membership_end FROM members WHERE id = ?1",
            params![id],
            member_from_row,
        )
        .optional()?;

    Ok(member)
}

// ============================================================================
// RENTAL TRANSACTIONS
// ============================================================================

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<RentalTransaction>> {
    let tx = conn
        .query_row(
            &format!("SELECT {TX_COLS} FROM rental_transactions WHERE id = ?1"),
            params![id],
            transaction_from_row,
        )
        .optional()?;

    Ok(tx)
}

pub fn open_rental_count(conn: &Connection, member_id: i64) -> Result<u32> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM rental_transactions WHERE member_id = ?1 AND status = 'open'",
        params![member_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// The open transaction holding a bike out, if any. At most one exists
/// while the status invariant holds.
pub fn open_transaction_for_bicycle(
    conn: &Connection,
    bicycle_id: i64,
) -> Result<Option<RentalTransaction>> {
    let tx = conn
        .query_row(
            &format!(
                "SELECT {TX_COLS} FROM rental_transactions
                 WHERE bicycle_id = ?1 AND status = 'open'"
            ),
            params![bicycle_id],
            transaction_from_row,
        )
        .optional()?;

    Ok(tx)
}

pub fn count_transactions(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM rental_transactions", [], |row| {
        row.get(0)
    })?;

    Ok(count)
}

// ============================================================================
// FEES
// ============================================================================

/// Append a fee row. Fees have no update path: once written at return
/// time they are immutable.
pub fn insert_fee(
    conn: &Connection,
    transaction_id: i64,
    fee_type: FeeType,
    amount: f64,
    note: &str,
) -> Result<Fee> {
    conn.execute(
        "INSERT INTO rental_fees (transaction_id, fee_type, amount, note)
         VALUES (?1, ?2, ?3, ?4)",
        params![transaction_id, fee_type.as_str(), amount, note],
    )?;

    Ok(Fee {
        id: conn.last_insert_rowid(),
        transaction_id,
        fee_type,
        amount,
        note: note.to_string(),
    })
}

pub fn fees_for_transaction(conn: &Connection, transaction_id: i64) -> Result<Vec<Fee>> {
    let mut stmt = conn.prepare(
        "SELECT id, transaction_id, fee_type, amount, note
         FROM rental_fees WHERE transaction_id = ?1 ORDER BY id",
    )?;

    let fees = stmt
        .query_map(params![transaction_id], fee_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(fees)
}

// ============================================================================
// OPEN RENTAL LISTING
// ============================================================================

/// One currently-rented bike, joined with enough inventory detail to
/// identify it at the counter.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpenRental {
    pub transaction_id: i64,
    pub bicycle_id: i64,
    pub member_id: i64,
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub brand: String,
    pub bike_type: String,
}

pub fn open_rentals(conn: &Connection) -> Result<Vec<OpenRental>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.bicycle_id, t.member_id, t.checkout_date, t.due_date,
                b.brand, b.bike_type
         FROM rental_transactions t
         JOIN bicycles b ON t.bicycle_id = b.id
         WHERE t.status = 'open'
         ORDER BY t.checkout_date, t.id",
    )?;

    let rentals = stmt
        .query_map([], |row| {
            let checkout_date: String = row.get(3)?;
            let due_date: String = row.get(4)?;

            Ok(OpenRental {
                transaction_id: row.get(0)?,
                bicycle_id: row.get(1)?,
                member_id: row.get(2)?,
                checkout_date: date_value(3, checkout_date)?,
                due_date: date_value(4, due_date)?,
                brand: row.get(5)?,
                bike_type: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rentals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bicycle(id: i64) -> Bicycle {
        Bicycle {
            id,
            brand: "Trek".to_string(),
            bike_type: "mountain".to_string(),
            frame_size: "M".to_string(),
            rental_rate: 12.0,
            purchase_date: NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
            condition: Condition::Good,
            status: BikeStatus::Available,
        }
    }

    fn test_member(id: i64, rental_limit: u32) -> Member {
        Member {
            id,
            rental_limit,
            membership_end: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        }
    }

    #[test]
    fn test_bicycle_round_trip() {
        let conn = open_in_memory().unwrap();
        let bike = test_bicycle(1);

        insert_bicycle(&conn, &bike).unwrap();
        let loaded = get_bicycle(&conn, 1).unwrap().expect("bike stored");

        assert_eq!(loaded, bike);
        assert_eq!(get_bicycle(&conn, 99).unwrap(), None);
    }

    #[test]
    fn test_insert_if_absent_is_idempotent() {
        let conn = open_in_memory().unwrap();
        let bike = test_bicycle(1);

        assert!(insert_bicycle_if_absent(&conn, &bike).unwrap());
        assert!(!insert_bicycle_if_absent(&conn, &bike).unwrap());
        assert_eq!(count_bicycles(&conn).unwrap(), 1);
    }

    #[test]
    fn test_member_round_trip_and_upsert() {
        let conn = open_in_memory().unwrap();
        let mut member = test_member(5, 2);

        insert_member(&conn, &member).unwrap();
        assert_eq!(get_member(&conn, 5).unwrap().unwrap(), member);

        // Re-import replaces the row
        member.rental_limit = 4;
        upsert_member(&conn, &member).unwrap();
        assert_eq!(get_member(&conn, 5).unwrap().unwrap().rental_limit, 4);
    }

    #[test]
    fn test_schema_rejects_unknown_condition() {
        let conn = open_in_memory().unwrap();

        let result = conn.execute(
            "INSERT INTO bicycles (id, brand, bike_type, frame_size, rental_rate,
                                   purchase_date, condition, status)
             VALUES (1, 'Trek', 'road', 'L', 10.0, '2022-01-01', 'rusty', 'available')",
            [],
        );

        assert!(result.is_err(), "CHECK constraint should reject 'rusty'");
    }

    #[test]
    fn test_fee_insert_and_listing() {
        let conn = open_in_memory().unwrap();
        insert_bicycle(&conn, &test_bicycle(1)).unwrap();
        insert_member(&conn, &test_member(1, 1)).unwrap();
        conn.execute(
            "INSERT INTO rental_transactions (bicycle_id, member_id, checkout_date, due_date)
             VALUES (1, 1, '2024-05-01', '2024-05-08')",
            [],
        )
        .unwrap();
        let tx_id = conn.last_insert_rowid();

        assert!(fees_for_transaction(&conn, tx_id).unwrap().is_empty());

        let fee = insert_fee(&conn, tx_id, FeeType::Late, 30.0, "3 days late").unwrap();
        assert_eq!(fee.transaction_id, tx_id);
        assert_eq!(fee.amount, 30.0);

        let fees = fees_for_transaction(&conn, tx_id).unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0], fee);
    }

    #[test]
    fn test_open_rental_count_sees_only_open_rows() {
        let conn = open_in_memory().unwrap();
        insert_bicycle(&conn, &test_bicycle(1)).unwrap();
        insert_bicycle(&conn, &test_bicycle(2)).unwrap();
        insert_member(&conn, &test_member(1, 5)).unwrap();

        conn.execute(
            "INSERT INTO rental_transactions (bicycle_id, member_id, checkout_date, due_date)
             VALUES (1, 1, '2024-05-01', '2024-05-08')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO rental_transactions
                 (bicycle_id, member_id, checkout_date, due_date, return_date, status)
             VALUES (2, 1, '2024-04-01', '2024-04-08', '2024-04-08', 'closed')",
            [],
        )
        .unwrap();

        assert_eq!(open_rental_count(&conn, 1).unwrap(), 1);
        assert_eq!(count_transactions(&conn).unwrap(), 2);

        assert!(open_transaction_for_bicycle(&conn, 1).unwrap().is_some());
        assert!(open_transaction_for_bicycle(&conn, 2).unwrap().is_none());

        let listing = open_rentals(&conn).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].bicycle_id, 1);
        assert_eq!(listing[0].brand, "Trek");
    }

    #[test]
    fn test_transaction_mapping_open_and_closed() {
        let conn = open_in_memory().unwrap();
        insert_bicycle(&conn, &test_bicycle(1)).unwrap();
        insert_member(&conn, &test_member(1, 1)).unwrap();
        conn.execute(
            "INSERT INTO rental_transactions
                 (bicycle_id, member_id, checkout_date, due_date, return_date, status)
             VALUES (1, 1, '2024-05-01', '2024-05-08', '2024-05-10', 'closed')",
            [],
        )
        .unwrap();
        let id = conn.last_insert_rowid();

        let tx = get_transaction(&conn, id).unwrap().unwrap();
        assert_eq!(tx.status, TxStatus::Closed);
        assert_eq!(
            tx.return_date,
            Some(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap())
        );
        assert!(!tx.is_open());

        assert_eq!(get_transaction(&conn, 999).unwrap(), None);
    }
}
