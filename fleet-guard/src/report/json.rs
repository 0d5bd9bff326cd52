//! Machine-readable JSON reports.

use tracing::{debug, instrument};

use super::{report_file_name, ReportDocument, ReportRenderer};
use crate::error::{FleetError, Result};
use crate::repository::UploadRecord;

/// Renders the full record as JSON.
#[derive(Debug, Clone)]
pub struct JsonReportRenderer {
    pretty: bool,
}

impl JsonReportRenderer {
    /// Creates a renderer producing pretty-printed JSON.
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer for JsonReportRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    #[instrument(skip(self, record), fields(record_id = %record.id))]
    fn render(&self, record: &UploadRecord) -> Result<ReportDocument> {
        record.summary.check_invariants()?;

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(record)
        } else {
            serde_json::to_vec(record)
        }
        .map_err(|e| FleetError::render(format!("failed to serialize record to JSON: {e}")))?;
        debug!(bytes = bytes.len(), "json report rendered");

        Ok(ReportDocument {
            file_name: report_file_name(record.id, self.extension()),
            content_type: self.content_type(),
            bytes,
            page_count: 1,
        })
    }
}
