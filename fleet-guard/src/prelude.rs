//! Prelude for commonly used types and traits in fleet-guard.

pub use crate::config::{PipelineConfig, ReportConfig};
pub use crate::error::{ErrorContext, ErrorKind, FleetError, Result};
pub use crate::logging::LogConfig;
pub use crate::repository::{UploadId, UploadRecord, UploadRepository};
