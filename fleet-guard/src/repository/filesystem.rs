//! Directory-backed [`UploadRepository`] storing one JSON file per record.
//!
//! Layout under the root directory:
//!
//! ```text
//! record-1.json
//! record-2.json
//! next-id
//! ```
//!
//! Every write goes to a temporary file first and is renamed into place, so a
//! reader either finds the complete record or no file at all.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{instrument, warn};

use super::{sort_most_recent_first, RepositoryMetadata, UploadId, UploadRecord, UploadRepository};
use crate::error::{FleetError, Result};
use crate::log_store_op;
use crate::logging::LogConfig;
use crate::summary::Summary;

const BACKEND: &str = "filesystem";
const RECORD_PREFIX: &str = "record-";
const RECORD_SUFFIX: &str = ".json";
const COUNTER_FILE: &str = "next-id";

/// Persists records as pretty-printed JSON files in a directory.
///
/// Creates and deletes are serialized by a process-local lock. Only one
/// process should write to a given directory at a time.
#[derive(Debug)]
pub struct FileSystemRepository {
    root: PathBuf,
    write_lock: Mutex<()>,
    log_config: LogConfig,
}

impl FileSystemRepository {
    /// Opens (creating if necessary) a repository rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            FleetError::repository(BACKEND, "open", format!("{}: {e}", root.display()))
        })?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            log_config: LogConfig::default(),
        })
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// The directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: UploadId) -> PathBuf {
        self.root.join(format!("{RECORD_PREFIX}{id}{RECORD_SUFFIX}"))
    }

    fn parse_record_id(file_name: &str) -> Option<UploadId> {
        file_name
            .strip_prefix(RECORD_PREFIX)?
            .strip_suffix(RECORD_SUFFIX)?
            .parse()
            .ok()
    }

    async fn record_ids(&self) -> Result<Vec<UploadId>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| FleetError::repository(BACKEND, "list", e.to_string()))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FleetError::repository(BACKEND, "list", e.to_string()))?
        {
            if let Some(id) = entry.file_name().to_str().and_then(Self::parse_record_id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Reads one record; `Ok(None)` when the file does not exist.
    async fn read_record(&self, id: UploadId) -> Result<Option<UploadRecord>> {
        match fs::read(self.record_path(id)).await {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    FleetError::repository(BACKEND, "get", format!("record {id} is corrupt: {e}"))
                })?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(FleetError::repository(BACKEND, "get", e.to_string())),
        }
    }

    /// Next id to allocate; caller must hold the write lock.
    ///
    /// Never below the highest stored id plus one, even if the counter file
    /// is missing or stale.
    async fn next_id(&self) -> Result<u64> {
        let counter_path = self.root.join(COUNTER_FILE);
        let counter = match fs::read_to_string(&counter_path).await {
            Ok(text) => Some(text.trim().parse::<u64>().map_err(|e| {
                FleetError::repository(BACKEND, "create", format!("bad id counter: {e}"))
            })?),
            Err(e) if e.kind() == IoErrorKind::NotFound => None,
            Err(e) => return Err(FleetError::repository(BACKEND, "create", e.to_string())),
        };

        let after_stored = self
            .record_ids()
            .await?
            .into_iter()
            .map(|id| id.get() + 1)
            .max()
            .unwrap_or(1);
        Ok(counter.map_or(after_stored, |c| c.max(after_stored)))
    }

    async fn write_atomically(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| FleetError::repository(BACKEND, "write", e.to_string()))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| FleetError::repository(BACKEND, "write", e.to_string()))
    }
}

#[async_trait]
impl UploadRepository for FileSystemRepository {
    #[instrument(skip(self, summary), fields(repository_type = BACKEND))]
    async fn create(&self, file_name: &str, summary: Summary) -> Result<UploadRecord> {
        let _guard = self.write_lock.lock().await;

        let id = UploadId::new(self.next_id().await?);
        let record = UploadRecord {
            id,
            file_name: file_name.to_string(),
            created_at: Utc::now().trunc_subsecs(0),
            summary,
        };

        let json = serde_json::to_vec_pretty(&record)?;
        // Reserve the id before the record becomes visible.
        self.write_atomically(
            &self.root.join(COUNTER_FILE),
            (id.get() + 1).to_string().as_bytes(),
        )
        .await?;
        self.write_atomically(&self.record_path(id), &json).await?;

        log_store_op!(self.log_config, record_id = %id, "record created");
        Ok(record)
    }

    #[instrument(skip(self), fields(repository_type = BACKEND))]
    async fn get(&self, id: UploadId) -> Result<UploadRecord> {
        self.read_record(id)
            .await?
            .ok_or(FleetError::NotFound { id })
    }

    #[instrument(skip(self), fields(repository_type = BACKEND))]
    async fn delete(&self, id: UploadId) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => {
                log_store_op!(self.log_config, record_id = %id, "record deleted");
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Err(FleetError::NotFound { id }),
            Err(e) => Err(FleetError::repository(BACKEND, "delete", e.to_string())),
        }
    }

    #[instrument(skip(self), fields(repository_type = BACKEND))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<UploadRecord>> {
        let mut records = Vec::new();
        for id in self.record_ids().await? {
            // A concurrent delete may remove the file between listing and reading.
            match self.read_record(id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(record_id = %id, error = %e, "skipping unreadable record"),
            }
        }

        sort_most_recent_first(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.record_ids().await?.len())
    }

    async fn metadata(&self) -> Result<RepositoryMetadata> {
        let mut metadata = RepositoryMetadata::new(BACKEND)
            .with_total_records(self.len().await?);

        if let Ok(meta) = fs::metadata(self.root.join(COUNTER_FILE)).await {
            if let Ok(modified) = meta.modified() {
                metadata.last_modified = Some(DateTime::<Utc>::from(modified));
            }
        }
        Ok(metadata)
    }
}
