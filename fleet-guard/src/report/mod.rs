//! Report rendering for stored uploads.
//!
//! A [`ReportRenderer`] turns one [`UploadRecord`] into a downloadable
//! [`ReportDocument`]. Rendering is a pure function of the record: the same
//! record always produces byte-identical output.
//!
//! # Examples
//!
//! ```rust
//! use fleet_guard::report::{ReportRenderer, TextReportRenderer};
//! # use fleet_guard::repository::UploadRecord;
//! # fn example(record: &UploadRecord) -> fleet_guard::error::Result<()> {
//! let document = TextReportRenderer::new().render(record)?;
//! assert_eq!(document.file_name, format!("Report_{}.txt", record.id));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;

use crate::config::ReportConfig;
use crate::error::{FleetError, Result};
use crate::repository::{UploadId, UploadRecord};

mod json;
mod text;

pub use json::JsonReportRenderer;
pub use text::{TextReportRenderer, MAINTENANCE_MESSAGE, NORMAL_MESSAGE, REPORT_TITLE};

/// A rendered report ready to be written or served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// Download name, `Report_{id}.{ext}`
    pub file_name: String,
    /// MIME type of `bytes`
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl ReportDocument {
    /// Size of the document in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Renders a stored upload into a document.
///
/// Implementations must check [`crate::summary::Summary::check_invariants`]
/// before laying anything out, and must not fail on large but valid
/// summaries.
///
/// # Examples
///
/// ```rust
/// use fleet_guard::report::{report_file_name, ReportDocument, ReportRenderer};
/// use fleet_guard::repository::UploadRecord;
///
/// struct Headline;
///
/// impl ReportRenderer for Headline {
///     fn extension(&self) -> &'static str { "txt" }
///     fn content_type(&self) -> &'static str { "text/plain; charset=utf-8" }
///
///     fn render(&self, record: &UploadRecord) -> fleet_guard::error::Result<ReportDocument> {
///         record.summary.check_invariants()?;
///         let line = format!("{}: {}\n", record.file_name, record.summary.health_score);
///         Ok(ReportDocument {
///             file_name: report_file_name(record.id, self.extension()),
///             content_type: self.content_type(),
///             bytes: line.into_bytes(),
///             page_count: 1,
///         })
///     }
/// }
/// ```
pub trait ReportRenderer: Send + Sync {
    /// File extension of the produced documents, without the dot.
    fn extension(&self) -> &'static str;

    /// MIME type of the produced documents.
    fn content_type(&self) -> &'static str;

    /// Renders a record.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Render`] if the record's summary is malformed.
    fn render(&self, record: &UploadRecord) -> Result<ReportDocument>;
}

/// Download name for the report of record `id`.
pub fn report_file_name(id: UploadId, extension: &str) -> String {
    format!("Report_{id}.{extension}")
}

/// Output formats offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    /// Builds the renderer for this format.
    pub fn renderer(&self, config: &ReportConfig) -> Box<dyn ReportRenderer> {
        match self {
            ReportFormat::Text => Box::new(TextReportRenderer::with_config(config.clone())),
            ReportFormat::Json => Box::new(JsonReportRenderer::new()),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(FleetError::Configuration(format!(
                "unknown report format '{other}' (expected text or json)"
            ))),
        }
    }
}
