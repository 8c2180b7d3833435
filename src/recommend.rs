// Purchase recommendations
//
// Aggregates the full rental history (open and closed) by bike type and
// brand, scores each group per the policy weighting, and greedily fills
// the budget with the highest-scoring candidates. Deterministic: equal
// scores break by lower cost, then by type/brand ascending.

use rusqlite::Connection;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::error::Result;
use crate::policy::{RentalPolicy, Scoring};

/// One suggested purchase: a bike of this type and brand, with the demand
/// score that ranked it and its estimated cost against the budget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub bike_type: String,
    pub brand: String,
    /// Number of historical rentals in this group.
    pub rentals: u32,
    pub score: f64,
    pub estimated_cost: f64,
}

/// Rank candidate purchases under a budget. No rental history or a budget
/// below the cheapest candidate yields an empty list, not an error.
pub fn recommend(
    conn: &Connection,
    policy: &RentalPolicy,
    budget: f64,
) -> Result<Vec<Recommendation>> {
    let mut stmt = conn.prepare(
        "SELECT b.bike_type, b.brand, COUNT(*), AVG(b.rental_rate)
         FROM rental_transactions t
         JOIN bicycles b ON t.bicycle_id = b.id
         GROUP BY b.bike_type, b.brand",
    )?;

    let mut candidates = stmt
        .query_map([], |row| {
            let bike_type: String = row.get(0)?;
            let brand: String = row.get(1)?;
            let rentals: u32 = row.get(2)?;
            let mean_rate: f64 = row.get(3)?;

            let score = match policy.scoring {
                Scoring::Frequency => f64::from(rentals),
                Scoring::FrequencyTimesRate => f64::from(rentals) * mean_rate,
            };

            Ok(Recommendation {
                bike_type,
                brand,
                rentals,
                score,
                estimated_cost: policy.estimated_unit_cost,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(
                a.estimated_cost
                    .partial_cmp(&b.estimated_cost)
                    .unwrap_or(Ordering::Equal),
            )
            .then_with(|| a.bike_type.cmp(&b.bike_type))
            .then_with(|| a.brand.cmp(&b.brand))
    });

    debug!(candidates = candidates.len(), budget, "ranking purchase candidates");

    let mut picked = Vec::new();
    let mut spent = 0.0;
    for candidate in candidates {
        if spent + candidate.estimated_cost <= budget {
            spent += candidate.estimated_cost;
            picked.push(candidate);
        }
    }

    Ok(picked)
}
