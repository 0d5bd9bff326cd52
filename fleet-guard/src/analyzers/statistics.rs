//! Fleet-level statistics over validated rows.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, instrument};

use crate::ingest::Row;

/// Occurrence counts per equipment type, in a fixed display order.
///
/// Entries are ordered by count (highest first); types with equal counts keep
/// the order in which they first appeared in the upload. The mapping
/// serializes as a JSON object whose keys follow that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDistribution {
    entries: Vec<(String, u64)>,
}

impl TypeDistribution {
    /// Creates an empty distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a distribution from the type label of each row.
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions: HashMap<&'a str, usize> = HashMap::new();
        let mut entries: Vec<(String, u64)> = Vec::new();

        for label in labels {
            match positions.get(label) {
                Some(&index) => entries[index].1 += 1,
                None => {
                    positions.insert(label, entries.len());
                    entries.push((label.to_string(), 1));
                }
            }
        }

        // Stable sort keeps first-appearance order among equal counts.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    /// Builds a distribution from already-counted pairs, keeping their order.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the count for a type, if present.
    pub fn get(&self, equipment_type: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(name, _)| name == equipment_type)
            .map(|(_, count)| *count)
    }

    /// Iterates over `(type, count)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Number of distinct types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no types are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

impl Serialize for TypeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, count) in &self.entries {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = TypeDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of equipment type to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, count)) = access.next_entry::<String, u64>()? {
                    entries.push((name, count));
                }
                Ok(TypeDistribution { entries })
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Aggregate statistics for one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStatistics {
    pub total_count: u64,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    pub type_distribution: TypeDistribution,
}

/// Computes row count, column means and the type distribution.
///
/// An empty table is valid input: every average is `0.0` and the
/// distribution is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsAggregator;

impl StatisticsAggregator {
    /// Creates a new aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Aggregates the given rows.
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    pub fn aggregate(&self, rows: &[Row]) -> FleetStatistics {
        let total_count = rows.len() as u64;

        let mean = |value: fn(&Row) -> f64| -> f64 {
            if rows.is_empty() {
                0.0
            } else {
                rows.iter().map(value).sum::<f64>() / rows.len() as f64
            }
        };

        let stats = FleetStatistics {
            total_count,
            avg_flowrate: mean(|r| r.flowrate),
            avg_pressure: mean(|r| r.pressure),
            avg_temperature: mean(|r| r.temperature),
            type_distribution: TypeDistribution::from_labels(
                rows.iter().map(|r| r.equipment_type.as_str()),
            ),
        };

        debug!(
            total_count,
            distinct_types = stats.type_distribution.len(),
            "statistics aggregated"
        );
        stats
    }
}
