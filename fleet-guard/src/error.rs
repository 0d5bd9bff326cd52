//! Error types for the fleet-guard analytics pipeline.
//!
//! Every failure the pipeline can surface is represented by [`FleetError`].
//! Each variant maps onto one boundary [`ErrorKind`], and
//! [`FleetError::user_message`] gives the short message that is safe to show
//! to whoever submitted the upload.

use thiserror::Error;

use crate::repository::UploadId;

/// The main error type for fleet-guard.
#[derive(Error, Debug)]
pub enum FleetError {
    /// No file was supplied with the upload request.
    #[error("No file uploaded")]
    EmptyPayload,

    /// The declared file name does not carry the recognized tabular suffix.
    #[error("Invalid format for '{file_name}': expected a .csv file")]
    BadExtension {
        /// The name the uploader declared for the file
        file_name: String,
    },

    /// The payload could not be decoded into a table with the required columns.
    #[error("Failed to parse table: {detail}")]
    ParseFailure {
        /// What went wrong, suitable for display
        detail: String,
    },

    /// No record exists under the requested identifier.
    #[error("Record {id} not found")]
    NotFound {
        /// The identifier that was looked up
        id: UploadId,
    },

    /// A persisted summary could not be rendered into a report.
    #[error("Failed to render report: {message}")]
    Render {
        /// Which invariant of the summary was violated
        message: String,
    },

    /// A storage backend failed.
    #[error("Repository error in {backend} during {operation}: {message}")]
    Repository {
        /// Backend name (e.g., "in_memory", "filesystem")
        backend: String,
        /// The operation that failed
        operation: String,
        /// Detailed error message
        message: String,
    },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from Arrow while decoding tabular data.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Boundary classification of a [`FleetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadExtension,
    ParseFailure,
    EmptyPayload,
    NotFound,
    RenderError,
    Storage,
    Configuration,
}

impl ErrorKind {
    /// Stable lowercase code for structured responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadExtension => "bad_extension",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::EmptyPayload => "empty_payload",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RenderError => "render_error",
            ErrorKind::Storage => "storage",
            ErrorKind::Configuration => "configuration",
        }
    }
}

/// A type alias for `Result<T, FleetError>`.
pub type Result<T> = std::result::Result<T, FleetError>;

impl FleetError {
    /// Creates a parse failure with the given detail.
    pub fn parse_failure(detail: impl Into<String>) -> Self {
        Self::ParseFailure {
            detail: detail.into(),
        }
    }

    /// Creates a render error with the given message.
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Creates a repository error.
    pub fn repository(
        backend: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Repository {
            backend: backend.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns the boundary kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FleetError::EmptyPayload => ErrorKind::EmptyPayload,
            FleetError::BadExtension { .. } => ErrorKind::BadExtension,
            FleetError::ParseFailure { .. } | FleetError::Arrow(_) => ErrorKind::ParseFailure,
            FleetError::NotFound { .. } => ErrorKind::NotFound,
            FleetError::Render { .. } => ErrorKind::RenderError,
            FleetError::Repository { .. } | FleetError::Io(_) | FleetError::Serialization(_) => {
                ErrorKind::Storage
            }
            FleetError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Short message that may cross the service boundary.
    ///
    /// Internal details (backend names, I/O paths, source chains) are never
    /// included; parse and render details are, since they describe the
    /// caller's own data.
    pub fn user_message(&self) -> String {
        match self {
            FleetError::EmptyPayload => "No file uploaded".to_string(),
            FleetError::BadExtension { .. } => {
                "Invalid format. Please upload a CSV file.".to_string()
            }
            FleetError::ParseFailure { detail } => format!("Could not read table: {detail}"),
            FleetError::Arrow(e) => format!("Could not read table: {e}"),
            FleetError::NotFound { .. } => "Record not found".to_string(),
            FleetError::Render { message } => format!("Could not render report: {message}"),
            FleetError::Repository { .. } | FleetError::Io(_) | FleetError::Serialization(_) => {
                "Storage error".to_string()
            }
            FleetError::Configuration(msg) => format!("Configuration error: {msg}"),
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Turns any error into a [`FleetError::ParseFailure`] prefixed by `msg`.
    fn parse_context(self, msg: &str) -> Result<T>;

    /// Like [`ErrorContext::parse_context`] with a lazily built message.
    fn with_parse_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn parse_context(self, msg: &str) -> Result<T> {
        self.map_err(|e| FleetError::parse_failure(format!("{msg}: {e}")))
    }

    fn with_parse_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            FleetError::parse_failure(format!("{msg}: {e}"))
        })
    }
}
