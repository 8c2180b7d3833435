// Rental checkout
//
// Validation runs in a fixed order (member, membership, limit, bike,
// availability) before any write. The transaction insert and the bike
// status flip commit together or not at all.

use chrono::Duration;
use rusqlite::{params, Connection};
use tracing::info;

use crate::clock::Clock;
use crate::db;
use crate::entities::{BikeStatus, RentalTransaction, TxStatus};
use crate::error::{RentalError, Result};
use crate::policy::RentalPolicy;

/// Check a bike out to a member. `period_days` overrides the policy's
/// default rental period. On success the bike is Rented and the returned
/// transaction is open with its due date derived from the checkout date.
pub fn rent(
    conn: &mut Connection,
    policy: &RentalPolicy,
    clock: &dyn Clock,
    member_id: i64,
    bicycle_id: i64,
    period_days: Option<u32>,
) -> Result<RentalTransaction> {
    let today = clock.today();
    let period = period_days.unwrap_or(policy.rental_period_days);

    // Store transaction scope: dropped without commit on any early
    // return, rolling back cleanly.
    let store_tx = conn.transaction()?;

    let member =
        db::get_member(&store_tx, member_id)?.ok_or(RentalError::MemberNotFound(member_id))?;

    if !member.is_active(today) {
        return Err(RentalError::MembershipExpired {
            member: member_id,
            end_date: member.membership_end,
        });
    }

    let open = db::open_rental_count(&store_tx, member_id)?;
    if open >= member.rental_limit {
        return Err(RentalError::RentalLimitExceeded {
            member: member_id,
            limit: member.rental_limit,
        });
    }

    let bike =
        db::get_bicycle(&store_tx, bicycle_id)?.ok_or(RentalError::BicycleNotFound(bicycle_id))?;

    if !bike.is_available() {
        return Err(RentalError::BicycleUnavailable {
            bicycle: bicycle_id,
            status: bike.status,
        });
    }

    let due_date = today + Duration::days(i64::from(period));

    store_tx.execute(
        "INSERT INTO rental_transactions (bicycle_id, member_id, checkout_date, due_date, status)
         VALUES (?1, ?2, ?3, ?4, 'open')",
        params![
            bicycle_id,
            member_id,
            today.to_string(),
            due_date.to_string()
        ],
    )?;
    let transaction_id = store_tx.last_insert_rowid();

    store_tx.execute(
        "UPDATE bicycles SET status = ?1 WHERE id = ?2",
        params![BikeStatus::Rented.as_str(), bicycle_id],
    )?;

    store_tx.commit()?;

    info!(member_id, bicycle_id, transaction_id, %due_date, "rental recorded");

    Ok(RentalTransaction {
        id: transaction_id,
        bicycle_id,
        member_id,
        checkout_date: today,
        due_date,
        return_date: None,
        status: TxStatus::Open,
    })
}
