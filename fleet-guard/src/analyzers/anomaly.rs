//! Rule-based anomaly detection over equipment rows.
//!
//! Detection is driven by an ordered table of [`AnomalyRule`]s. Each rule is
//! a threshold on one measurement plus a severity and a message template, so
//! new rules compose without touching scoring or assembly code.
//!
//! ## Example
//!
//! ```rust
//! use fleet_guard::analyzers::anomaly::AnomalyEngine;
//! use fleet_guard::ingest::Row;
//!
//! let rows = vec![
//!     Row::new(100.0, 2.0, 95.0, "Pump"),
//!     Row::new(100.0, 2.0, 50.0, "Pump"),
//!     Row::new(100.0, 2.0, 91.0, "Valve"),
//! ];
//!
//! let result = AnomalyEngine::standard().detect(&rows);
//! assert_eq!(result.alerts, vec!["CRITICAL: 2 units showing overheating (>90°C)"]);
//! assert_eq!(result.counts.get("overheating"), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::ingest::Row;
use crate::log_rule;
use crate::logging::LogConfig;

/// Rule name for units running hot.
pub const OVERHEATING: &str = "overheating";
/// Rule name for units losing pressure.
pub const LOW_PRESSURE: &str = "low_pressure";

/// Alert emitted when no rule matched any row.
pub const ALL_CLEAR: &str = "All systems operational";

/// Severity label prefixed to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A measurement a rule can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Flowrate,
    Pressure,
    Temperature,
}

impl Measurement {
    /// Reads this measurement from a row.
    pub fn of(&self, row: &Row) -> f64 {
        match self {
            Measurement::Flowrate => row.flowrate,
            Measurement::Pressure => row.pressure,
            Measurement::Temperature => row.temperature,
        }
    }
}

/// An exclusive threshold. A value equal to the limit never matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Above(f64),
    Below(f64),
}

impl Threshold {
    /// Whether `value` lies strictly beyond the limit. NaN never matches.
    pub fn is_violated_by(&self, value: f64) -> bool {
        match *self {
            Threshold::Above(limit) => value > limit,
            Threshold::Below(limit) => value < limit,
        }
    }
}

/// A named predicate over a row, with severity and message template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRule {
    /// Stable rule name, used as the key of violation counts
    pub name: String,
    pub severity: Severity,
    pub measurement: Measurement,
    pub threshold: Threshold,
    /// Text following the count, e.g. "units showing overheating (>90°C)"
    pub description: String,
}

impl AnomalyRule {
    /// Creates a new rule.
    pub fn new(
        name: impl Into<String>,
        severity: Severity,
        measurement: Measurement,
        threshold: Threshold,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            severity,
            measurement,
            threshold,
            description: description.into(),
        }
    }

    /// Temperature strictly above 90 °C.
    pub fn overheating() -> Self {
        Self::new(
            OVERHEATING,
            Severity::Critical,
            Measurement::Temperature,
            Threshold::Above(90.0),
            "units showing overheating (>90°C)",
        )
    }

    /// Pressure strictly below 1.5 bar.
    pub fn low_pressure() -> Self {
        Self::new(
            LOW_PRESSURE,
            Severity::Warning,
            Measurement::Pressure,
            Threshold::Below(1.5),
            "units showing low pressure (<1.5 bar)",
        )
    }

    /// Whether this rule matches the row.
    pub fn matches(&self, row: &Row) -> bool {
        self.threshold.is_violated_by(self.measurement.of(row))
    }

    /// Renders the alert text for `count` violating rows.
    pub fn render_message(&self, count: u64) -> String {
        format!("{}: {count} {}", self.severity, self.description)
    }
}

/// Violation counts keyed by rule name, in rule-definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    counts: Vec<(String, u64)>,
}

impl ViolationCounts {
    /// Creates an empty set of counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the count for a rule, replacing any earlier value.
    pub fn set(&mut self, rule: impl Into<String>, count: u64) {
        let rule = rule.into();
        match self.counts.iter_mut().find(|(name, _)| *name == rule) {
            Some(entry) => entry.1 = count,
            None => self.counts.push((rule, count)),
        }
    }

    /// Builder-style variant of [`ViolationCounts::set`].
    pub fn with(mut self, rule: impl Into<String>, count: u64) -> Self {
        self.set(rule, count);
        self
    }

    /// Count for a rule; rules never evaluated count as zero.
    pub fn get(&self, rule: &str) -> u64 {
        self.counts
            .iter()
            .find(|(name, _)| name == rule)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Iterates over `(rule, count)` pairs in rule order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Whether every rule counted zero violations.
    pub fn is_clear(&self) -> bool {
        self.counts.iter().all(|(_, count)| *count == 0)
    }
}

/// Output of [`AnomalyEngine::detect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// One alert per matching rule in rule order, or the single all-clear sentinel.
    pub alerts: Vec<String>,
    /// Raw per-rule violation counts.
    pub counts: ViolationCounts,
}

impl AnomalyResult {
    /// Whether the result carries only the all-clear sentinel.
    pub fn is_all_clear(&self) -> bool {
        self.alerts.len() == 1 && self.alerts[0] == ALL_CLEAR
    }
}

/// Evaluates an ordered rule table against rows.
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    rules: Vec<AnomalyRule>,
    log_config: LogConfig,
}

impl Default for AnomalyEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnomalyEngine {
    /// Engine with the standard rules: overheating, then low pressure.
    pub fn standard() -> Self {
        Self::with_rules(vec![AnomalyRule::overheating(), AnomalyRule::low_pressure()])
    }

    /// Engine with a custom ordered rule table.
    pub fn with_rules(rules: Vec<AnomalyRule>) -> Self {
        Self {
            rules,
            log_config: LogConfig::default(),
        }
    }

    /// Appends a rule after the existing ones.
    pub fn add_rule(mut self, rule: AnomalyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// The rule table, in evaluation order.
    pub fn rules(&self) -> &[AnomalyRule] {
        &self.rules
    }

    /// Runs every rule independently over all rows.
    #[instrument(skip(self, rows), fields(rows = rows.len(), rules = self.rules.len()))]
    pub fn detect(&self, rows: &[Row]) -> AnomalyResult {
        let mut counts = ViolationCounts::new();
        let mut alerts = Vec::new();

        for rule in &self.rules {
            let count = rows.iter().filter(|row| rule.matches(row)).count() as u64;
            log_rule!(self.log_config, rule = %rule.name, count, "rule evaluated");

            counts.set(rule.name.clone(), count);
            if count > 0 {
                alerts.push(rule.render_message(count));
            }
        }

        if alerts.is_empty() {
            alerts.push(ALL_CLEAR.to_string());
        }

        debug!(alerts = alerts.len(), "anomaly detection finished");
        AnomalyResult { alerts, counts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pressure: f64, temperature: f64) -> Row {
        Row::new(100.0, pressure, temperature, "Pump")
    }

    #[test]
    fn test_overheating_is_exclusive() {
        let rule = AnomalyRule::overheating();
        assert!(!rule.matches(&row(2.0, 90.0)));
        assert!(rule.matches(&row(2.0, 90.0001)));
    }

    #[test]
    fn test_low_pressure_is_exclusive() {
        let rule = AnomalyRule::low_pressure();
        assert!(!rule.matches(&row(1.5, 20.0)));
        assert!(rule.matches(&row(1.49, 20.0)));
    }

    #[test]
    fn test_nan_never_matches() {
        assert!(!AnomalyRule::overheating().matches(&row(2.0, f64::NAN)));
        assert!(!AnomalyRule::low_pressure().matches(&row(f64::NAN, 20.0)));
    }

    #[test]
    fn test_alert_once_per_rule_in_rule_order() {
        let rows = vec![row(1.0, 95.0), row(1.2, 91.0), row(1.4, 50.0)];
        let result = AnomalyEngine::standard().detect(&rows);

        assert_eq!(
            result.alerts,
            vec![
                "CRITICAL: 2 units showing overheating (>90°C)".to_string(),
                "WARNING: 3 units showing low pressure (<1.5 bar)".to_string(),
            ]
        );
        assert_eq!(result.counts.get(OVERHEATING), 2);
        assert_eq!(result.counts.get(LOW_PRESSURE), 3);
    }

    #[test]
    fn test_zero_count_rules_are_omitted() {
        let rows = vec![row(1.0, 20.0)];
        let result = AnomalyEngine::standard().detect(&rows);

        assert_eq!(
            result.alerts,
            vec!["WARNING: 1 units showing low pressure (<1.5 bar)".to_string()]
        );
        assert_eq!(result.counts.get(OVERHEATING), 0);
    }

    #[test]
    fn test_all_clear_sentinel() {
        let result = AnomalyEngine::standard().detect(&[row(2.0, 50.0)]);
        assert_eq!(result.alerts, vec![ALL_CLEAR.to_string()]);
        assert!(result.is_all_clear());
        assert!(result.counts.is_clear());

        let empty = AnomalyEngine::standard().detect(&[]);
        assert!(empty.is_all_clear());
    }

    #[test]
    fn test_counts_keep_rule_order() {
        let result = AnomalyEngine::standard().detect(&[]);
        let names: Vec<_> = result.counts.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec![OVERHEATING, LOW_PRESSURE]);
    }

    #[test]
    fn test_additional_rule_composes() {
        let engine = AnomalyEngine::standard().add_rule(AnomalyRule::new(
            "low_flow",
            Severity::Warning,
            Measurement::Flowrate,
            Threshold::Below(10.0),
            "units showing low flow (<10)",
        ));
        let rows = vec![Row::new(5.0, 2.0, 50.0, "Pump")];
        let result = engine.detect(&rows);

        assert_eq!(
            result.alerts,
            vec!["WARNING: 1 units showing low flow (<10)".to_string()]
        );
        assert_eq!(result.counts.get("low_flow"), 1);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }
}
