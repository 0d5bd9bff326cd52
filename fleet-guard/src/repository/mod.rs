//! Upload record storage.
//!
//! The pipeline never mutates stored records. It creates new ones through
//! [`UploadRepository::create`] and reads them back by id or as a
//! most-recent-first history window. Backends own identifiers, timestamps and
//! the durable lifetime of each record.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FleetError, Result};
use crate::summary::Summary;

pub mod filesystem;
pub mod in_memory;

pub use filesystem::FileSystemRepository;
pub use in_memory::InMemoryRepository;

/// Display format for record creation timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Opaque identifier of a stored upload record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(u64);

impl UploadId {
    /// Wraps a raw identifier.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UploadId {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| FleetError::Configuration(format!("invalid record id '{s}'")))
    }
}

/// A stored upload: file name, creation time and its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: UploadId,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub summary: Summary,
}

impl UploadRecord {
    /// Creation time formatted as `YYYY-MM-DD HH:MM`.
    pub fn created_at_display(&self) -> String {
        self.created_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// One row of the upload history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: UploadId,
    pub file_name: String,
    /// Creation time formatted as `YYYY-MM-DD HH:MM`
    pub date: String,
    pub summary: Summary,
}

impl From<UploadRecord> for HistoryEntry {
    fn from(record: UploadRecord) -> Self {
        Self {
            date: record.created_at_display(),
            id: record.id,
            file_name: record.file_name,
            summary: record.summary,
        }
    }
}

/// Storage backend for upload records.
///
/// Implementations must make `create` atomic (a fresh id per call, never a
/// partially written record) and must make `delete` atomic with respect to
/// concurrent `get` calls on the same id: a reader sees either the full
/// record or [`FleetError::NotFound`].
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Stores a new record, allocating its id and creation timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist the record.
    async fn create(&self, file_name: &str, summary: Summary) -> Result<UploadRecord>;

    /// Loads a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] if no record has this id.
    async fn get(&self, id: UploadId) -> Result<UploadRecord>;

    /// Deletes a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] if no record has this id.
    async fn delete(&self, id: UploadId) -> Result<()>;

    /// Returns at most `limit` records, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    async fn list_recent(&self, limit: usize) -> Result<Vec<UploadRecord>>;

    /// Number of stored records.
    async fn len(&self) -> Result<usize>;

    /// Whether the repository holds no records.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Returns metadata about the repository.
    async fn metadata(&self) -> Result<RepositoryMetadata> {
        Ok(RepositoryMetadata::default())
    }
}

/// Orders records most recent first, newest id first on equal timestamps.
pub(crate) fn sort_most_recent_first(records: &mut [UploadRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// Metadata about an upload repository.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RepositoryMetadata {
    /// The type of repository backend (e.g., "filesystem", "in_memory").
    pub backend_type: Option<String>,

    /// Total number of stored records.
    pub total_records: Option<usize>,

    /// Last modification timestamp.
    pub last_modified: Option<DateTime<Utc>>,
}

impl RepositoryMetadata {
    /// Creates a new repository metadata instance.
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: Some(backend_type.into()),
            ..Default::default()
        }
    }

    /// Sets the total number of records.
    pub fn with_total_records(mut self, count: usize) -> Self {
        self.total_records = Some(count);
        self
    }

    /// Sets the last modification time.
    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }
}
