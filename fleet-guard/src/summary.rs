//! The persisted result of analysing one upload.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::analyzers::{AnomalyResult, FleetStatistics, TypeDistribution, MAX_SCORE};
use crate::logging::truncate_field;
use crate::prelude::*;

/// Immutable computed result of one upload.
///
/// `alerts` is never empty: when no rule matched it holds exactly the
/// all-clear sentinel, so consumers can always show `alerts[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_count: u64,
    #[serde(with = "ieee_float")]
    pub avg_flowrate: f64,
    #[serde(with = "ieee_float")]
    pub avg_pressure: f64,
    #[serde(alias = "avg_temp", with = "ieee_float")]
    pub avg_temperature: f64,
    pub type_distribution: TypeDistribution,
    pub health_score: u32,
    pub alerts: Vec<String>,
}

/// Serde for averages that may be NaN or infinite.
///
/// JSON numbers cannot hold those, so they are written as `"NaN"`, `"inf"`
/// and `"-inf"`. Finite values stay plain numbers.
mod ieee_float {
    use std::fmt;

    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl<'de> Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            match value {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(E::invalid_value(Unexpected::Str(other), &self)),
            }
        }
    }
}

impl Summary {
    /// Checks the invariants every persisted summary must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Render`] naming the first violated invariant.
    pub fn check_invariants(&self) -> Result<()> {
        if self.alerts.is_empty() {
            return Err(FleetError::render("summary has no alerts"));
        }
        if self.health_score > MAX_SCORE {
            return Err(FleetError::render(format!(
                "health score {} exceeds {MAX_SCORE}",
                self.health_score
            )));
        }
        let distributed = self.type_distribution.total();
        if distributed != self.total_count {
            return Err(FleetError::render(format!(
                "type distribution covers {distributed} units but total count is {}",
                self.total_count
            )));
        }
        Ok(())
    }

    /// The first alert, which is always present for a valid summary.
    pub fn headline_alert(&self) -> Option<&str> {
        self.alerts.first().map(String::as_str)
    }
}

/// Packages pipeline outputs into a [`Summary`] and hands it to the store.
///
/// The assembler computes nothing itself, and never allocates identifiers or
/// timestamps; those belong to the repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryAssembler;

impl SummaryAssembler {
    /// Creates a new assembler.
    pub fn new() -> Self {
        Self
    }

    /// Composes statistics, anomaly output and health score.
    #[instrument(skip_all, fields(file_name = %truncate_field(file_name, 128)))]
    pub fn assemble(
        &self,
        file_name: &str,
        stats: FleetStatistics,
        anomalies: AnomalyResult,
        health_score: u32,
    ) -> Summary {
        Summary {
            total_count: stats.total_count,
            avg_flowrate: stats.avg_flowrate,
            avg_pressure: stats.avg_pressure,
            avg_temperature: stats.avg_temperature,
            type_distribution: stats.type_distribution,
            health_score,
            alerts: anomalies.alerts,
        }
    }

    /// Persists an assembled summary through the repository's create operation.
    ///
    /// # Errors
    ///
    /// Propagates any repository failure unchanged.
    pub async fn submit<R>(&self, repository: &R, file_name: &str, summary: Summary) -> Result<UploadRecord>
    where
        R: UploadRepository + ?Sized,
    {
        let record = repository.create(file_name, summary).await?;
        info!(
            record_id = %record.id,
            health_score = record.summary.health_score,
            "upload summary stored"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{ViolationCounts, ALL_CLEAR};
    use crate::repository::InMemoryRepository;

    fn summary() -> Summary {
        Summary {
            total_count: 3,
            avg_flowrate: 100.0,
            avg_pressure: 2.0,
            avg_temperature: 78.67,
            type_distribution: TypeDistribution::from_entries([("Pump", 2), ("Valve", 1)]),
            health_score: 80,
            alerts: vec!["CRITICAL: 2 units showing overheating (>90°C)".to_string()],
        }
    }

    #[test]
    fn test_non_finite_averages_survive_json() {
        let mut original = summary();
        original.avg_flowrate = f64::INFINITY;
        original.avg_pressure = f64::NEG_INFINITY;
        original.avg_temperature = f64::NAN;

        let json = serde_json::to_value(&original).unwrap();
        assert_eq!(json["avg_flowrate"], "inf");
        assert_eq!(json["avg_pressure"], "-inf");
        assert_eq!(json["avg_temperature"], "NaN");

        let loaded: Summary = serde_json::from_value(json).unwrap();
        assert_eq!(loaded.avg_flowrate, f64::INFINITY);
        assert_eq!(loaded.avg_pressure, f64::NEG_INFINITY);
        assert!(loaded.avg_temperature.is_nan());
    }

    #[test]
    fn test_finite_averages_stay_numbers() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["avg_flowrate"], 100.0);
        assert_eq!(json["total_count"], 3);

        let loaded: Summary = serde_json::from_str(
            &json.to_string().replace("\"avg_pressure\":2.0", "\"avg_pressure\":2"),
        )
        .unwrap();
        assert_eq!(loaded, summary());

        let bad = json.to_string().replace("100.0", "\"fast\"");
        assert!(serde_json::from_str::<Summary>(&bad).is_err());
    }

    #[test]
    fn test_assemble_is_pure_packaging() {
        let stats = FleetStatistics {
            total_count: 1,
            avg_flowrate: 1.0,
            avg_pressure: 2.0,
            avg_temperature: 3.0,
            type_distribution: TypeDistribution::from_entries([("Pump", 1)]),
        };
        let anomalies = AnomalyResult {
            alerts: vec![ALL_CLEAR.to_string()],
            counts: ViolationCounts::new(),
        };

        let summary = SummaryAssembler::new().assemble("a.csv", stats, anomalies, 100);
        assert_eq!(summary.total_count, 1);
        assert_eq!(summary.avg_temperature, 3.0);
        assert_eq!(summary.health_score, 100);
        assert_eq!(summary.headline_alert(), Some(ALL_CLEAR));
        assert!(summary.check_invariants().is_ok());
    }

    #[test]
    fn test_invariant_violations() {
        let mut no_alerts = summary();
        no_alerts.alerts.clear();
        assert_eq!(
            no_alerts.check_invariants().unwrap_err().kind(),
            ErrorKind::RenderError
        );

        let mut bad_score = summary();
        bad_score.health_score = 101;
        assert!(bad_score.check_invariants().is_err());

        let mut bad_total = summary();
        bad_total.total_count = 4;
        assert!(bad_total.check_invariants().is_err());
    }

    #[test]
    fn test_accepts_legacy_temperature_key() {
        let json = r#"{
            "total_count": 1,
            "avg_flowrate": 1.0,
            "avg_pressure": 2.0,
            "avg_temp": 3.0,
            "type_distribution": {"Pump": 1},
            "health_score": 100,
            "alerts": ["All systems operational"]
        }"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.avg_temperature, 3.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"total_count": 1, "alerts": ["All systems operational"]}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());
    }

    #[tokio::test]
    async fn test_submit_hands_off_to_repository() {
        let repo = InMemoryRepository::new();
        let record = SummaryAssembler::new()
            .submit(&repo, "line7.csv", summary())
            .await
            .unwrap();

        assert_eq!(record.file_name, "line7.csv");
        assert_eq!(repo.get(record.id).await.unwrap().summary, summary());
    }
}
