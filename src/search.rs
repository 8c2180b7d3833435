// Inventory search
//
// Builds one parameterized SELECT from an optional predicate set. All
// predicates combine with AND; ties are always broken by id ascending so
// the same query over the same data yields the same order. Read-only.

use rusqlite::{params_from_iter, Connection, ToSql};

use crate::db::{bicycle_from_row, BICYCLE_COLS};
use crate::entities::{Bicycle, BikeStatus, Condition, ParseEnumError};
use crate::error::{RentalError, Result};

// ============================================================================
// SORT KEY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Brand,
    Rate,
    /// Available bikes first, then maintenance, then rented.
    Availability,
}

impl SortKey {
    pub fn parse(s: &str) -> std::result::Result<SortKey, ParseEnumError> {
        match s.trim().to_lowercase().as_str() {
            "brand" => Ok(SortKey::Brand),
            "rate" => Ok(SortKey::Rate),
            "availability" => Ok(SortKey::Availability),
            other => Err(ParseEnumError::new("sort key", other)),
        }
    }

    fn order_clause(&self) -> &'static str {
        match self {
            SortKey::Brand => " ORDER BY brand COLLATE NOCASE ASC, id ASC",
            SortKey::Rate => " ORDER BY rental_rate ASC, id ASC",
            // Status values sort alphabetically: available, maintenance, rented
            SortKey::Availability => " ORDER BY status ASC, id ASC",
        }
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Predicate set for an inventory search. Every field is optional; the
/// empty query matches the whole inventory in id order.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring match on brand.
    pub brand: Option<String>,
    /// Case-insensitive substring match on bike type.
    pub bike_type: Option<String>,
    /// Exact (case-insensitive) frame size.
    pub frame_size: Option<String>,
    pub status: Option<BikeStatus>,
    pub condition: Option<Condition>,
    /// Inclusive daily-rate bounds.
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub sort: Option<SortKey>,
}

impl SearchQuery {
    fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_rate, self.max_rate) {
            if min > max {
                return Err(RentalError::InvalidQuery(format!(
                    "rate range is inverted: min {min} > max {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Run a search against the inventory. The returned Vec is a finite
/// snapshot; re-running the query restarts the sequence against current
/// data.
pub fn search(conn: &Connection, query: &SearchQuery) -> Result<Vec<Bicycle>> {
    query.validate()?;

    let mut sql = format!("SELECT {BICYCLE_COLS} FROM bicycles WHERE 1=1");
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(brand) = &query.brand {
        sql.push_str(" AND LOWER(brand) LIKE LOWER(?)");
        values.push(Box::new(format!("%{brand}%")));
    }
    if let Some(bike_type) = &query.bike_type {
        sql.push_str(" AND LOWER(bike_type) LIKE LOWER(?)");
        values.push(Box::new(format!("%{bike_type}%")));
    }
    if let Some(frame_size) = &query.frame_size {
        sql.push_str(" AND LOWER(frame_size) = LOWER(?)");
        values.push(Box::new(frame_size.clone()));
    }
    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        values.push(Box::new(status.as_str()));
    }
    if let Some(condition) = query.condition {
        sql.push_str(" AND condition = ?");
        values.push(Box::new(condition.as_str()));
    }
    if let Some(min_rate) = query.min_rate {
        sql.push_str(" AND rental_rate >= ?");
        values.push(Box::new(min_rate));
    }
    if let Some(max_rate) = query.max_rate {
        sql.push_str(" AND rental_rate <= ?");
        values.push(Box::new(max_rate));
    }

    sql.push_str(
        query
            .sort
            .map(|key| key.order_clause())
            .unwrap_or(" ORDER BY id ASC"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let bikes = stmt
        .query_map(
            params_from_iter(values.iter().map(|v| v.as_ref())),
            bicycle_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(bikes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::NaiveDate;

    fn bike(
        id: i64,
        brand: &str,
        bike_type: &str,
        rate: f64,
        status: BikeStatus,
        condition: Condition,
    ) -> Bicycle {
        Bicycle {
            id,
            brand: brand.to_string(),
            bike_type: bike_type.to_string(),
            frame_size: "M".to_string(),
            rental_rate: rate,
            purchase_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            condition,
            status,
        }
    }

    fn seeded_store() -> Connection {
        let conn = db::open_in_memory().unwrap();
        let bikes = [
            bike(1, "Trek", "mountain", 15.0, BikeStatus::Available, Condition::Good),
            bike(2, "Giant", "road", 12.0, BikeStatus::Available, Condition::Excellent),
            bike(3, "Trek", "mountain", 10.0, BikeStatus::Rented, Condition::Fair),
            bike(4, "Bianchi", "road", 20.0, BikeStatus::Maintenance, Condition::Damaged),
            bike(5, "Scott", "mountain", 11.0, BikeStatus::Available, Condition::Good),
        ];
        for b in &bikes {
            db::insert_bicycle(&conn, b).unwrap();
        }
        conn
    }

    #[test]
    fn test_empty_query_returns_full_inventory_in_id_order() {
        let conn = seeded_store();
        let results = search(&conn, &SearchQuery::default()).unwrap();

        assert_eq!(results.len(), 5);
        let ids: Vec<i64> = results.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_type_and_status_filter_sorted_by_rate() {
        let conn = seeded_store();
        let query = SearchQuery {
            bike_type: Some("mountain".to_string()),
            status: Some(BikeStatus::Available),
            sort: Some(SortKey::Rate),
            ..Default::default()
        };

        let results = search(&conn, &query).unwrap();

        // Only available mountain bikes, cheapest first
        let ids: Vec<i64> = results.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![5, 1]);
        assert!(results.iter().all(|b| b.status == BikeStatus::Available));
        assert!(results.iter().all(|b| b.bike_type == "mountain"));
    }

    #[test]
    fn test_brand_substring_is_case_insensitive() {
        let conn = seeded_store();
        let query = SearchQuery {
            brand: Some("tre".to_string()),
            ..Default::default()
        };

        let results = search(&conn, &query).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|b| b.brand == "Trek"));
    }

    #[test]
    fn test_rate_range_is_inclusive() {
        let conn = seeded_store();
        let query = SearchQuery {
            min_rate: Some(11.0),
            max_rate: Some(15.0),
            ..Default::default()
        };

        let ids: Vec<i64> = search(&conn, &query)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 5]);
    }

    #[test]
    fn test_inverted_rate_range_is_invalid() {
        let conn = seeded_store();
        let query = SearchQuery {
            min_rate: Some(20.0),
            max_rate: Some(5.0),
            ..Default::default()
        };

        let err = search(&conn, &query).unwrap_err();
        assert!(matches!(err, RentalError::InvalidQuery(_)));
    }

    #[test]
    fn test_unknown_sort_key_fails_to_parse() {
        assert_eq!(SortKey::parse("rate").unwrap(), SortKey::Rate);
        assert_eq!(SortKey::parse(" Brand ").unwrap(), SortKey::Brand);

        let err = SortKey::parse("weight").unwrap_err();
        assert_eq!(err.to_string(), "unrecognized sort key: 'weight'");
    }

    #[test]
    fn test_brand_sort_breaks_ties_by_id() {
        let conn = seeded_store();
        let query = SearchQuery {
            sort: Some(SortKey::Brand),
            ..Default::default()
        };

        let ids: Vec<i64> = search(&conn, &query)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        // Bianchi, Giant, Scott, Trek(1), Trek(3)
        assert_eq!(ids, vec![4, 2, 5, 1, 3]);
    }

    #[test]
    fn test_availability_sort_puts_available_first() {
        let conn = seeded_store();
        let query = SearchQuery {
            sort: Some(SortKey::Availability),
            ..Default::default()
        };

        let results = search(&conn, &query).unwrap();
        assert_eq!(results[0].status, BikeStatus::Available);
        assert_eq!(results.last().unwrap().status, BikeStatus::Rented);
    }

    #[test]
    fn test_condition_filter() {
        let conn = seeded_store();
        let query = SearchQuery {
            condition: Some(Condition::Damaged),
            ..Default::default()
        };

        let results = search(&conn, &query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 4);
    }
}
