//! In-memory implementation of [`UploadRepository`] for tests and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tokio::sync::RwLock;
use tracing::instrument;

use super::{sort_most_recent_first, RepositoryMetadata, UploadId, UploadRecord, UploadRepository};
use crate::error::{FleetError, Result};
use crate::log_store_op;
use crate::logging::LogConfig;
use crate::summary::Summary;

const BACKEND: &str = "in_memory";

#[derive(Debug, Default)]
struct Store {
    records: HashMap<UploadId, UploadRecord>,
    next_id: u64,
    last_modified: Option<chrono::DateTime<Utc>>,
}

/// Stores all records in memory behind a single async `RwLock`.
///
/// Ids are allocated from a counter under the write lock, so concurrent
/// creates always receive distinct ids, and ids are never reused after a
/// delete. Clones share the same storage.
///
/// # Example
///
/// ```rust
/// use fleet_guard::repository::{InMemoryRepository, UploadRepository};
/// # use fleet_guard::summary::Summary;
/// # async fn example(summary: Summary) -> fleet_guard::error::Result<()> {
/// let repository = InMemoryRepository::new();
/// let record = repository.create("pumps.csv", summary).await?;
/// let recent = repository.list_recent(5).await?;
/// assert_eq!(recent[0].id, record.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    store: Arc<RwLock<Store>>,
    log_config: LogConfig,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store {
                next_id: 1,
                ..Default::default()
            })),
            log_config: LogConfig::default(),
        }
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Inserts a fully formed record, keeping its id and timestamp.
    ///
    /// Useful for seeding history in tests. The id counter is advanced past
    /// the inserted id.
    pub async fn insert(&self, record: UploadRecord) {
        let mut store = self.store.write().await;
        store.next_id = store.next_id.max(record.id.get() + 1);
        store.records.insert(record.id, record);
        store.last_modified = Some(Utc::now());
    }

    /// Clears all stored records. The id counter is not reset.
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        store.records.clear();
        store.last_modified = Some(Utc::now());
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadRepository for InMemoryRepository {
    #[instrument(skip(self, summary), fields(repository_type = BACKEND))]
    async fn create(&self, file_name: &str, summary: Summary) -> Result<UploadRecord> {
        let mut store = self.store.write().await;

        let id = UploadId::new(store.next_id);
        store.next_id += 1;

        let record = UploadRecord {
            id,
            file_name: file_name.to_string(),
            created_at: Utc::now().trunc_subsecs(0),
            summary,
        };
        store.records.insert(id, record.clone());
        store.last_modified = Some(Utc::now());
        drop(store);

        log_store_op!(self.log_config, record_id = %id, "record created");
        Ok(record)
    }

    #[instrument(skip(self), fields(repository_type = BACKEND))]
    async fn get(&self, id: UploadId) -> Result<UploadRecord> {
        let store = self.store.read().await;
        store
            .records
            .get(&id)
            .cloned()
            .ok_or(FleetError::NotFound { id })
    }

    #[instrument(skip(self), fields(repository_type = BACKEND))]
    async fn delete(&self, id: UploadId) -> Result<()> {
        let mut store = self.store.write().await;

        if store.records.remove(&id).is_none() {
            return Err(FleetError::NotFound { id });
        }
        store.last_modified = Some(Utc::now());
        drop(store);

        log_store_op!(self.log_config, record_id = %id, "record deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(repository_type = BACKEND))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<UploadRecord>> {
        let store = self.store.read().await;
        let mut records: Vec<UploadRecord> = store.records.values().cloned().collect();
        drop(store);

        sort_most_recent_first(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.store.read().await.records.len())
    }

    async fn metadata(&self) -> Result<RepositoryMetadata> {
        let store = self.store.read().await;
        let mut metadata = RepositoryMetadata::new(BACKEND).with_total_records(store.records.len());
        metadata.last_modified = store.last_modified;
        Ok(metadata)
    }
}
