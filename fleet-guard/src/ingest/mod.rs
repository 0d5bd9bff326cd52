//! Ingestion of uploaded equipment tables.
//!
//! An [`Upload`] is the raw unit received at the boundary. The
//! [`TableValidator`] turns it into typed [`Row`]s or rejects it wholesale.

use serde::{Deserialize, Serialize};

mod csv;

pub use csv::{CsvOptions, TableValidator};

/// Suffix an upload's declared name must end with.
pub const CSV_SUFFIX: &str = ".csv";

/// Column holding the measured flow rate.
pub const FLOWRATE_COLUMN: &str = "Flowrate";
/// Column holding the measured pressure, in bar.
pub const PRESSURE_COLUMN: &str = "Pressure";
/// Column holding the measured temperature, in °C.
pub const TEMPERATURE_COLUMN: &str = "Temperature";
/// Column holding the equipment type label.
pub const TYPE_COLUMN: &str = "Type";

/// Columns every uploaded table must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    FLOWRATE_COLUMN,
    PRESSURE_COLUMN,
    TEMPERATURE_COLUMN,
    TYPE_COLUMN,
];

/// One equipment observation.
///
/// Rows live only for the duration of a pipeline run and are never stored
/// individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
    #[serde(rename = "type")]
    pub equipment_type: String,
}

impl Row {
    /// Creates a row from its four measurements.
    pub fn new(
        flowrate: f64,
        pressure: f64,
        temperature: f64,
        equipment_type: impl Into<String>,
    ) -> Self {
        Self {
            flowrate,
            pressure,
            temperature,
            equipment_type: equipment_type.into(),
        }
    }
}

/// A submitted file: the declared name plus its fully materialized bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Creates an upload from a declared file name and its contents.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether the declared name ends with the recognized tabular suffix.
    ///
    /// The comparison is case-sensitive: `readings.CSV` is not accepted.
    pub fn has_csv_suffix(&self) -> bool {
        has_csv_suffix(&self.file_name)
    }
}

pub(crate) fn has_csv_suffix(file_name: &str) -> bool {
    file_name.ends_with(CSV_SUFFIX)
}
