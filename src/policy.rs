// Rental policy - policy as data
//
// Every constant the processors apply (rental period, fee rates, the
// recommendation weighting) lives here and is injected at the call site;
// nothing is hard-coded inside the processors. Policies load from a JSON
// file, with sensible defaults for any omitted field.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RECOMMENDATION WEIGHTING
// ============================================================================

/// How the recommendation engine turns rental history into a demand score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Score = number of rentals of the group.
    Frequency,
    /// Score = number of rentals x mean daily rate of the group. Weights
    /// demand by what the fleet actually earns per day. The default.
    FrequencyTimesRate,
}

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentalPolicy {
    /// Default rental period when the checkout does not specify one.
    pub rental_period_days: u32,

    /// Charged per day past the due date.
    pub late_fee_per_day: f64,

    /// Damage fee table, indexed by severity delta. A bike returned one
    /// condition step worse than it went out costs `damage_fee_steps[0]`,
    /// two steps `[1]`, three steps `[2]` (excellent straight to damaged).
    pub damage_fee_steps: [f64; 3],

    /// Demand score weighting for purchase recommendations.
    pub scoring: Scoring,

    /// Assumed cost of one replacement bike when budgeting purchases.
    pub estimated_unit_cost: f64,

    /// When true, a bike returned in damaged condition goes to maintenance
    /// instead of back into the available pool.
    pub damaged_to_maintenance: bool,
}

impl Default for RentalPolicy {
    fn default() -> Self {
        RentalPolicy {
            rental_period_days: 7,
            late_fee_per_day: 10.0,
            damage_fee_steps: [15.0, 40.0, 90.0],
            scoring: Scoring::FrequencyTimesRate,
            estimated_unit_cost: 100.0,
            damaged_to_maintenance: true,
        }
    }
}

impl RentalPolicy {
    /// Load a policy from a JSON file. Missing fields fall back to the
    /// defaults above.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read policy file: {:?}", path.as_ref()))?;

        let policy: RentalPolicy =
            serde_json::from_str(&content).context("Failed to parse policy JSON")?;

        Ok(policy)
    }

    /// Damage fee for a severity delta. Zero for a non-positive delta;
    /// deltas beyond the table are clamped to its last entry.
    pub fn damage_fee(&self, severity_delta: u8) -> f64 {
        if severity_delta == 0 {
            return 0.0;
        }
        let idx = usize::from(severity_delta - 1).min(self.damage_fee_steps.len() - 1);
        self.damage_fee_steps[idx]
    }
}
