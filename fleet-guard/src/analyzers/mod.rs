//! Analysis stages that run over validated rows.
//!
//! - [`statistics`]: row count, column means and the equipment type distribution
//! - [`anomaly`]: the ordered threshold-rule table and its alerts
//! - [`health`]: the 0–100 health score derived from violation counts
//!
//! Statistics and anomaly detection are independent of each other; the
//! health score consumes only the anomaly counts.

pub mod anomaly;
pub mod health;
pub mod statistics;

pub use anomaly::{
    AnomalyEngine, AnomalyResult, AnomalyRule, Measurement, Severity, Threshold,
    ViolationCounts, ALL_CLEAR, LOW_PRESSURE, OVERHEATING,
};
pub use health::{HealthScorer, Penalty, MAX_SCORE, MIN_SCORE};
pub use statistics::{FleetStatistics, StatisticsAggregator, TypeDistribution};
