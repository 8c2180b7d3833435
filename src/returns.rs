// Rental return
//
// Looks up the open transaction, charges late and damage fees per policy,
// closes the transaction and restores the bike in one store transaction.
// A zero-fee return still closes and restores; fee rows exist only when
// an amount is actually owed.

use rusqlite::{params, Connection};
use tracing::info;

use crate::clock::Clock;
use crate::db;
use crate::entities::{BikeStatus, Condition, FeeType, ReturnReceipt, TxStatus};
use crate::error::{RentalError, Result};
use crate::policy::RentalPolicy;

/// Process the return of a rented bike.
///
/// Fails with `TransactionNotFound` when the transaction id is unknown or
/// the rental was already closed. A bike coming back in damaged condition
/// is routed to maintenance rather than the available pool when the
/// policy's `damaged_to_maintenance` flag is set (the default).
pub fn return_bicycle(
    conn: &mut Connection,
    policy: &RentalPolicy,
    clock: &dyn Clock,
    transaction_id: i64,
    returned_condition: Condition,
) -> Result<ReturnReceipt> {
    let today = clock.today();

    let store_tx = conn.transaction()?;

    let mut rental = db::get_transaction(&store_tx, transaction_id)?
        .ok_or(RentalError::TransactionNotFound(transaction_id))?;

    if !rental.is_open() {
        return Err(RentalError::TransactionNotFound(transaction_id));
    }

    let bike = db::get_bicycle(&store_tx, rental.bicycle_id)?
        .ok_or(RentalError::BicycleNotFound(rental.bicycle_id))?;

    let mut fees = Vec::new();

    let days_late = rental.days_late(today);
    if days_late > 0 {
        let amount = days_late as f64 * policy.late_fee_per_day;
        let note = format!("{days_late} day(s) past due date {}", rental.due_date);
        fees.push(db::insert_fee(
            &store_tx,
            transaction_id,
            FeeType::Late,
            amount,
            &note,
        )?);
    }

    let severity_delta = returned_condition
        .severity()
        .saturating_sub(bike.condition.severity());
    if severity_delta > 0 {
        let amount = policy.damage_fee(severity_delta);
        let note = format!("condition degraded {} -> {}", bike.condition, returned_condition);
        fees.push(db::insert_fee(
            &store_tx,
            transaction_id,
            FeeType::Damage,
            amount,
            &note,
        )?);
    }

    store_tx.execute(
        "UPDATE rental_transactions SET return_date = ?1, status = 'closed' WHERE id = ?2",
        params![today.to_string(), transaction_id],
    )?;

    let new_status = if returned_condition == Condition::Damaged && policy.damaged_to_maintenance
    {
        BikeStatus::Maintenance
    } else {
        BikeStatus::Available
    };

    store_tx.execute(
        "UPDATE bicycles SET status = ?1, condition = ?2 WHERE id = ?3",
        params![
            new_status.as_str(),
            returned_condition.as_str(),
            rental.bicycle_id
        ],
    )?;

    store_tx.commit()?;

    rental.return_date = Some(today);
    rental.status = TxStatus::Closed;

    info!(
        transaction_id,
        bicycle_id = rental.bicycle_id,
        days_late,
        fee_count = fees.len(),
        new_status = %new_status,
        "return processed"
    );

    Ok(ReturnReceipt {
        transaction: rental,
        fees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::entities::{Bicycle, Member};
    use crate::rent::rent;
    use chrono::NaiveDate;

    fn bike(id: i64, condition: Condition) -> Bicycle {
        Bicycle {
            id,
            brand: "Giant".to_string(),
            bike_type: "road".to_string(),
            frame_size: "L".to_string(),
            rental_rate: 10.0,
            purchase_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            condition,
            status: BikeStatus::Available,
        }
    }

    /// Rent bike 1 to member 1 on 2024-05-01 (due 2024-05-08 under the
    /// default policy) and hand back the store.
    fn rented_store(condition: Condition) -> (Connection, RentalPolicy, i64) {
        let mut conn = db::open_in_memory().unwrap();
        let policy = RentalPolicy::default();
        db::insert_bicycle(&conn, &bike(1, condition)).unwrap();
        db::insert_member(
            &conn,
            &Member {
                id: 1,
                rental_limit: 2,
                membership_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            },
        )
        .unwrap();

        let checkout = FixedClock::from_ymd(2024, 5, 1);
        let tx = rent(&mut conn, &policy, &checkout, 1, 1, None).unwrap();
        (conn, policy, tx.id)
    }

    #[test]
    fn test_on_time_same_condition_return_has_no_fees() {
        let (mut conn, policy, tx_id) = rented_store(Condition::Good);
        let clock = FixedClock::from_ymd(2024, 5, 8);

        let receipt = return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Good).unwrap();

        assert!(receipt.fees.is_empty());
        assert_eq!(receipt.total_fees(), 0.0);
        assert_eq!(receipt.transaction.status, TxStatus::Closed);
        assert_eq!(receipt.transaction.return_date, Some(clock.today()));

        // Zero fees still restores availability and closes the rental
        let b = db::get_bicycle(&conn, 1).unwrap().unwrap();
        assert_eq!(b.status, BikeStatus::Available);
        assert!(db::open_transaction_for_bicycle(&conn, 1)
            .unwrap()
            .is_none());
        assert!(db::fees_for_transaction(&conn, tx_id).unwrap().is_empty());
    }

    #[test]
    fn test_three_days_late_charges_three_times_the_daily_rate() {
        // Rented day 0 (2024-05-01), due day 7, returned day 10
        let (mut conn, policy, tx_id) = rented_store(Condition::Good);
        let clock = FixedClock::from_ymd(2024, 5, 11);

        let receipt = return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Good).unwrap();

        assert_eq!(receipt.fees.len(), 1);
        let fee = &receipt.fees[0];
        assert_eq!(fee.fee_type, FeeType::Late);
        assert_eq!(fee.amount, 3.0 * policy.late_fee_per_day);
        assert!(fee.note.contains("3 day(s)"));

        let b = db::get_bicycle(&conn, 1).unwrap().unwrap();
        assert_eq!(b.status, BikeStatus::Available);
    }

    #[test]
    fn test_early_return_has_no_late_fee() {
        let (mut conn, policy, tx_id) = rented_store(Condition::Good);
        let clock = FixedClock::from_ymd(2024, 5, 3);

        let receipt = return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Good).unwrap();
        assert!(receipt.fees.is_empty());
    }

    #[test]
    fn test_damage_fee_follows_the_severity_delta() {
        // Went out Excellent, came back Fair: two steps worse
        let (mut conn, policy, tx_id) = rented_store(Condition::Excellent);
        let clock = FixedClock::from_ymd(2024, 5, 8);

        let receipt = return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Fair).unwrap();

        assert_eq!(receipt.fees.len(), 1);
        let fee = &receipt.fees[0];
        assert_eq!(fee.fee_type, FeeType::Damage);
        assert_eq!(fee.amount, policy.damage_fee_steps[1]);
        assert!(fee.note.contains("excellent -> fair"));

        // Condition recorded on the bike
        let b = db::get_bicycle(&conn, 1).unwrap().unwrap();
        assert_eq!(b.condition, Condition::Fair);
        assert_eq!(b.status, BikeStatus::Available);
    }

    #[test]
    fn test_improved_condition_is_not_charged() {
        let (mut conn, policy, tx_id) = rented_store(Condition::Fair);
        let clock = FixedClock::from_ymd(2024, 5, 8);

        let receipt =
            return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Excellent).unwrap();
        assert!(receipt.fees.is_empty());
        assert_eq!(
            db::get_bicycle(&conn, 1).unwrap().unwrap().condition,
            Condition::Excellent
        );
    }

    #[test]
    fn test_damaged_return_goes_to_maintenance_and_charges_both_fees() {
        let (mut conn, policy, tx_id) = rented_store(Condition::Good);
        // Two days late and damaged
        let clock = FixedClock::from_ymd(2024, 5, 10);

        let receipt =
            return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Damaged).unwrap();

        assert_eq!(receipt.fees.len(), 2);
        assert_eq!(receipt.fees[0].fee_type, FeeType::Late);
        assert_eq!(receipt.fees[0].amount, 2.0 * policy.late_fee_per_day);
        assert_eq!(receipt.fees[1].fee_type, FeeType::Damage);
        // Good -> Damaged is two severity steps
        assert_eq!(receipt.fees[1].amount, policy.damage_fee_steps[1]);

        let b = db::get_bicycle(&conn, 1).unwrap().unwrap();
        assert_eq!(b.status, BikeStatus::Maintenance);
        assert_eq!(b.condition, Condition::Damaged);
    }

    #[test]
    fn test_damaged_return_stays_available_when_policy_disables_routing() {
        let (mut conn, mut policy, tx_id) = rented_store(Condition::Good);
        policy.damaged_to_maintenance = false;
        let clock = FixedClock::from_ymd(2024, 5, 8);

        return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Damaged).unwrap();

        let b = db::get_bicycle(&conn, 1).unwrap().unwrap();
        assert_eq!(b.status, BikeStatus::Available);
    }

    #[test]
    fn test_second_return_fails_as_not_found() {
        let (mut conn, policy, tx_id) = rented_store(Condition::Good);
        let clock = FixedClock::from_ymd(2024, 5, 8);

        return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Good).unwrap();

        let err =
            return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Good).unwrap_err();
        assert!(matches!(err, RentalError::TransactionNotFound(id) if id == tx_id));

        // No second round of writes: still exactly zero fee rows
        assert!(db::fees_for_transaction(&conn, tx_id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_transaction_fails() {
        let mut conn = db::open_in_memory().unwrap();
        let policy = RentalPolicy::default();
        let clock = FixedClock::from_ymd(2024, 5, 8);

        let err = return_bicycle(&mut conn, &policy, &clock, 404, Condition::Good).unwrap_err();
        assert!(matches!(err, RentalError::TransactionNotFound(404)));
    }

    #[test]
    fn test_returned_bike_is_immediately_searchable_as_available() {
        let (mut conn, policy, tx_id) = rented_store(Condition::Good);
        let clock = FixedClock::from_ymd(2024, 5, 8);

        return_bicycle(&mut conn, &policy, &clock, tx_id, Condition::Good).unwrap();

        let results = crate::search::search(
            &conn,
            &crate::search::SearchQuery {
                status: Some(BikeStatus::Available),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(results.iter().any(|b| b.id == 1));
    }
}
