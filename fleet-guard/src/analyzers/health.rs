//! Health scoring from anomaly violation counts.
//!
//! The score starts at [`MAX_SCORE`] and loses a fixed penalty per violating
//! unit. Penalties are flat and are not normalized by fleet size, so a
//! two-unit fleet with one overheating unit scores the same as a 2000-unit
//! fleet with one overheating unit.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::anomaly::{ViolationCounts, LOW_PRESSURE, OVERHEATING};

/// Best possible score.
pub const MAX_SCORE: u32 = 100;
/// Worst possible score.
pub const MIN_SCORE: u32 = 0;

/// Points lost per overheating unit.
pub const OVERHEATING_PENALTY: u32 = 10;
/// Points lost per low-pressure unit.
pub const LOW_PRESSURE_PENALTY: u32 = 5;

/// Per-rule penalty applied for every violating unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub rule: String,
    pub points: u32,
}

/// Maps violation counts to a score in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthScorer {
    penalties: Vec<Penalty>,
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::standard()
    }
}

impl HealthScorer {
    /// Scorer with the standard penalties: 10 per overheating unit, 5 per low-pressure unit.
    pub fn standard() -> Self {
        Self::with_penalties([
            (OVERHEATING, OVERHEATING_PENALTY),
            (LOW_PRESSURE, LOW_PRESSURE_PENALTY),
        ])
    }

    /// Scorer with a custom penalty table.
    pub fn with_penalties<I, S>(penalties: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            penalties: penalties
                .into_iter()
                .map(|(rule, points)| Penalty {
                    rule: rule.into(),
                    points,
                })
                .collect(),
        }
    }

    /// The penalty table.
    pub fn penalties(&self) -> &[Penalty] {
        &self.penalties
    }

    /// Computes the health score.
    ///
    /// Rules without a penalty entry do not affect the score. The result is
    /// clamped to `[MIN_SCORE, MAX_SCORE]`.
    #[instrument(skip(self, counts))]
    pub fn score(&self, counts: &ViolationCounts) -> u32 {
        for (rule, count) in counts.iter() {
            if count > 0 && !self.penalties.iter().any(|p| p.rule == rule) {
                debug!(rule, count, "no penalty configured for rule");
            }
        }

        let deduction = self.penalties.iter().fold(0u64, |acc, penalty| {
            acc.saturating_add(counts.get(&penalty.rule).saturating_mul(u64::from(penalty.points)))
        });

        let raw = i128::from(MAX_SCORE) - i128::from(deduction);
        let score = raw.clamp(i128::from(MIN_SCORE), i128::from(MAX_SCORE)) as u32;
        debug!(deduction, score, "health scored");
        score
    }
}
