//! # fleet-guard - Equipment Sensor Analytics
//!
//! fleet-guard turns uploaded CSV exports of equipment sensor readings into
//! fleet-level statistics, safety alerts and a single health score, keeps a
//! history of past uploads, and renders any stored upload as a report.
//!
//! ## Quick Start
//!
//! ```rust
//! use fleet_guard::prelude::*;
//! use fleet_guard::ingest::Upload;
//! use fleet_guard::report::TextReportRenderer;
//! use fleet_guard::repository::InMemoryRepository;
//! use fleet_guard::service::AnalyticsService;
//!
//! # async fn example() -> fleet_guard::error::Result<()> {
//! let service = AnalyticsService::new(InMemoryRepository::new());
//!
//! let csv = "\
//! Equipment Name,Type,Flowrate,Pressure,Temperature
//! Pump-1,Pump,120.5,2.0,95
//! Pump-2,Pump,110.0,2.0,50
//! Valve-1,Valve,60.0,2.0,91
//! ";
//! let record = service.ingest(Some(Upload::new("line1.csv", csv))).await?;
//!
//! assert_eq!(record.summary.health_score, 80);
//! assert_eq!(
//!     record.summary.alerts,
//!     vec!["CRITICAL: 2 units showing overheating (>90°C)"]
//! );
//!
//! let report = service.report(record.id, &TextReportRenderer::new()).await?;
//! assert_eq!(report.file_name, format!("Report_{}.txt", record.id));
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`ingest::TableValidator`] rejects anything but a `.csv` upload, decodes
//!    it with Arrow, and requires the `Flowrate`, `Pressure`, `Temperature`
//!    and `Type` columns.
//! 2. [`analyzers::StatisticsAggregator`] computes the row count, column means
//!    and the per-type distribution.
//! 3. [`analyzers::AnomalyEngine`] evaluates an ordered rule table
//!    (overheating above 90 °C, low pressure below 1.5 bar).
//! 4. [`analyzers::HealthScorer`] subtracts flat per-unit penalties from 100.
//! 5. [`summary::SummaryAssembler`] packages the results and stores them
//!    through an [`repository::UploadRepository`].
//!
//! Reports are rendered later from the stored record by a
//! [`report::ReportRenderer`].
//!
//! ## Architecture
//!
//! - **`ingest`**: upload and row types, CSV validation
//! - **`analyzers`**: statistics, anomaly rules, health scoring
//! - **`summary`**: the persisted summary and its assembler
//! - **`repository`**: storage trait with in-memory and filesystem backends
//! - **`report`**: paginated text and JSON renderers
//! - **`service`**: ingest/history/report/delete boundary operations
//! - **`config`**, **`logging`**, **`error`**: ambient configuration,
//!   tracing setup and the crate error type

pub mod analyzers;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod prelude;
pub mod report;
pub mod repository;
pub mod service;
pub mod summary;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
