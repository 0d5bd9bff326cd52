//! The boundary operations offered to routers and command-line front ends.
//!
//! [`AnalyticsService`] wires the pipeline stages together over one
//! [`UploadRepository`]:
//!
//! ```text
//! Upload ─► TableValidator ─┬─► StatisticsAggregator ────────────────┐
//!                           └─► AnomalyEngine ─► HealthScorer ───────┴─► SummaryAssembler ─► repository
//! ```
//!
//! Reports are rendered later, from the stored record alone.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::analyzers::{AnomalyEngine, HealthScorer, StatisticsAggregator};
use crate::ingest::{TableValidator, Upload};
use crate::logging::truncate_field;
use crate::prelude::*;
use crate::report::{ReportDocument, ReportRenderer};
use crate::repository::HistoryEntry;
use crate::summary::SummaryAssembler;

/// Ingest, history, report and delete operations over a repository.
///
/// # Examples
///
/// ```rust
/// use fleet_guard::ingest::Upload;
/// use fleet_guard::repository::InMemoryRepository;
/// use fleet_guard::service::AnalyticsService;
///
/// # async fn example() -> fleet_guard::error::Result<()> {
/// let service = AnalyticsService::new(InMemoryRepository::new());
/// let csv = "Type,Flowrate,Pressure,Temperature\nPump,100,2.0,95\n";
/// let record = service.ingest(Some(Upload::new("pumps.csv", csv))).await?;
/// assert_eq!(record.summary.health_score, 90);
/// # Ok(())
/// # }
/// ```
pub struct AnalyticsService<R: UploadRepository + ?Sized> {
    repository: Arc<R>,
    config: PipelineConfig,
    validator: TableValidator,
    aggregator: StatisticsAggregator,
    engine: AnomalyEngine,
    scorer: HealthScorer,
    assembler: SummaryAssembler,
}

impl<R: UploadRepository> AnalyticsService<R> {
    /// Creates a service with the default configuration.
    pub fn new(repository: R) -> Self {
        Self::from_shared(Arc::new(repository), PipelineConfig::default())
    }

    /// Creates a service with a custom configuration.
    pub fn with_config(repository: R, config: PipelineConfig) -> Self {
        Self::from_shared(Arc::new(repository), config)
    }
}

impl<R: UploadRepository + ?Sized> AnalyticsService<R> {
    /// Creates a service over a shared repository.
    pub fn from_shared(repository: Arc<R>, config: PipelineConfig) -> Self {
        Self {
            validator: TableValidator::with_options(config.csv.clone()),
            aggregator: StatisticsAggregator::new(),
            engine: AnomalyEngine::standard().with_log_config(config.log.clone()),
            scorer: HealthScorer::standard(),
            assembler: SummaryAssembler::new(),
            repository,
            config,
        }
    }

    /// Replaces the anomaly rule table.
    pub fn with_engine(mut self, engine: AnomalyEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Replaces the penalty table.
    pub fn with_scorer(mut self, scorer: HealthScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// The underlying repository.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full pipeline on one upload and stores the result.
    ///
    /// # Errors
    ///
    /// - [`FleetError::EmptyPayload`] when no upload (or no file name) is given
    /// - [`FleetError::BadExtension`] / [`FleetError::ParseFailure`] from validation
    /// - any repository error from storing the summary
    ///
    /// Nothing is stored when an error is returned.
    #[instrument(skip(self, upload))]
    pub async fn ingest(&self, upload: Option<Upload>) -> Result<UploadRecord> {
        let upload = match upload {
            Some(upload) if !upload.file_name.is_empty() => upload,
            _ => {
                warn!("upload rejected: no file provided");
                return Err(FleetError::EmptyPayload);
            }
        };

        let rows = self
            .validator
            .validate(&upload.bytes, &upload.file_name)
            .inspect_err(|e| {
                warn!(
                    file_name = %truncate_field(&upload.file_name, self.config.log.max_field_length),
                    error_kind = e.kind().code(),
                    "upload rejected"
                )
            })?;

        let stats = self.aggregator.aggregate(&rows);
        let anomalies = self.engine.detect(&rows);
        let health_score = self.scorer.score(&anomalies.counts);
        let summary = self
            .assembler
            .assemble(&upload.file_name, stats, anomalies, health_score);

        info!(
            rows = rows.len(),
            health_score,
            alerts = summary.alerts.len(),
            "upload analysed"
        );

        self.assembler
            .submit(self.repository.as_ref(), &upload.file_name, summary)
            .await
    }

    /// The configured window of most recent uploads.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.history_with_limit(self.config.history_window).await
    }

    /// At most `limit` most recent uploads, newest first.
    #[instrument(skip(self))]
    pub async fn history_with_limit(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let records = self.repository.list_recent(limit).await?;
        Ok(records.into_iter().map(HistoryEntry::from).collect())
    }

    /// Loads one stored upload.
    pub async fn record(&self, id: UploadId) -> Result<UploadRecord> {
        self.repository.get(id).await
    }

    /// Deletes one stored upload.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: UploadId) -> Result<()> {
        self.repository.delete(id).await?;
        info!(record_id = %id, "record deleted");
        Ok(())
    }

    /// Resolves a record and renders it.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for an unknown id, or the renderer's
    /// error for a malformed summary.
    #[instrument(skip(self, renderer))]
    pub async fn report(&self, id: UploadId, renderer: &dyn ReportRenderer) -> Result<ReportDocument> {
        let record = self.repository.get(id).await?;
        let document = renderer.render(&record)?;
        info!(
            record_id = %id,
            file_name = %document.file_name,
            pages = document.page_count,
            "report rendered"
        );
        Ok(document)
    }
}
