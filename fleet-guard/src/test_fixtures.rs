//! Canned uploads and records for tests.
//!
//! The CSV payloads match the reference scenarios: overheating units,
//! low-pressure units, and a header-only table.

use chrono::{TimeZone, Utc};

use crate::analyzers::{TypeDistribution, ALL_CLEAR};
use crate::repository::{UploadId, UploadRecord};
use crate::summary::Summary;

/// Three units, two of them above 90°C.
pub const OVERHEATING_CSV: &str = "\
Equipment Name,Type,Flowrate,Pressure,Temperature
Pump-1,Pump,120.5,2.0,95
Pump-2,Pump,110.0,2.0,50
Valve-1,Valve,60.0,2.0,91
";

/// Two units, both below 1.5 bar.
pub const LOW_PRESSURE_CSV: &str = "\
Equipment Name,Type,Flowrate,Pressure,Temperature
Reactor-1,Reactor,80.0,1.0,50
Reactor-2,Reactor,82.0,1.4,60
";

/// A header with no data rows.
pub const HEADER_ONLY_CSV: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n";

/// A healthy fleet with a mix of types.
pub const NOMINAL_CSV: &str = "\
Equipment Name,Type,Flowrate,Pressure,Temperature
Pump-1,Pump,100,2.5,70
Valve-1,Valve,50,3.0,65
Pump-2,Pump,110,2.2,75
Exchanger-1,HeatExchanger,90,1.8,80
";

/// A summary with no alerts raised.
pub fn all_clear_summary() -> Summary {
    Summary {
        total_count: 3,
        avg_flowrate: 100.0,
        avg_pressure: 2.5,
        avg_temperature: 70.0,
        type_distribution: TypeDistribution::from_entries([("Pump", 2), ("Valve", 1)]),
        health_score: 100,
        alerts: vec![ALL_CLEAR.to_string()],
    }
}

/// A summary where two units overheat.
pub fn overheating_summary() -> Summary {
    Summary {
        total_count: 3,
        avg_flowrate: 96.83,
        avg_pressure: 2.0,
        avg_temperature: 78.67,
        type_distribution: TypeDistribution::from_entries([("Pump", 2), ("Valve", 1)]),
        health_score: 80,
        alerts: vec!["CRITICAL: 2 units showing overheating (>90°C)".to_string()],
    }
}

/// A record created at 2025-01-01 12:`minute`:00 UTC.
///
/// # Panics
///
/// Panics if `minute` is 60 or more.
pub fn record_at(id: u64, minute: u32) -> UploadRecord {
    assert!(minute < 60, "record_at minute must be below 60, got {minute}");
    UploadRecord {
        id: UploadId::new(id),
        file_name: format!("upload-{id}.csv"),
        created_at: Utc
            .with_ymd_and_hms(2025, 1, 1, 12, minute, 0)
            .single()
            .expect("fixed fixture timestamp is valid"),
        summary: all_clear_summary(),
    }
}
