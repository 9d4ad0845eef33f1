//! Ingestion pipeline: discovery, bounded parse pool and the single-writer
//! persistence queue.
//!
//! Shutdown is ordered: the parse pool drains first, then the persistence
//! queue, and only then is the store closed.

pub mod config;
pub mod discovery;
pub mod file_task;
pub mod generated;
pub mod pool;
pub mod queue;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use dx_core::{Error, ProjectIdentity, Result};
use tokio_util::sync::CancellationToken;

pub use config::IngestConfig;
pub use discovery::discover_sources;
pub use file_task::{FileOutcome, FileWorker};
pub use generated::GeneratedCodeDetector;
pub use pool::{ParsePool, PoolReport};
pub use queue::{PersistenceQueue, QueueHandle, QueueReport};

use crate::storage::RecordStore;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_discovered: u64,
    /// Files extracted, by the grammar that parsed them.
    pub files_extracted: BTreeMap<String, u64>,
    pub files_skipped_generated: u64,
    pub files_failed: u64,
    pub records_submitted: u64,
    pub records_stored: u64,
    pub records_failed: u64,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn total_extracted(&self) -> u64 {
        self.files_extracted.values().sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "files discovered:      {}", self.files_discovered)?;
        write!(f, "files extracted:       {}", self.total_extracted())?;
        if !self.files_extracted.is_empty() {
            let by_grammar: Vec<String> = self
                .files_extracted
                .iter()
                .map(|(grammar, count)| format!("{grammar}: {count}"))
                .collect();
            write!(f, " ({})", by_grammar.join(", "))?;
        }
        writeln!(f)?;
        writeln!(f, "files skipped (gen):   {}", self.files_skipped_generated)?;
        writeln!(f, "files failed:          {}", self.files_failed)?;
        writeln!(f, "records submitted:     {}", self.records_submitted)?;
        writeln!(f, "records stored:        {}", self.records_stored)?;
        if self.records_failed > 0 {
            writeln!(f, "records failed:        {}", self.records_failed)?;
        }
        if self.interrupted {
            writeln!(f, "run was interrupted")?;
        }
        Ok(())
    }
}

pub struct Ingestion {
    config: IngestConfig,
    store: Arc<dyn RecordStore>,
    cancel: CancellationToken,
}

impl Ingestion {
    pub fn new(config: IngestConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config: config.validated(),
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned token, e.g. one tied to Ctrl-C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Extracts every Java source under `roots` into the store, then closes
    /// the store.
    pub async fn run(&self, roots: &[PathBuf]) -> Result<RunSummary> {
        let identity = Arc::new(ProjectIdentity::new(
            self.config.project_name.clone(),
            self.config.project_version.clone(),
        ));
        let interval = self.config.progress_interval();

        let queue = PersistenceQueue::start(self.store.clone(), self.config.queue_capacity, interval);
        let worker = Arc::new(FileWorker::new(identity, self.config.include_generated));
        let mut pool = ParsePool::new(self.config.max_workers, worker, queue.handle(), interval);

        let mut discovered = 0u64;
        for path in discover_sources(roots, self.config.include_tests) {
            if self.cancel.is_cancelled() {
                break;
            }
            discovered += 1;
            pool.submit(path);
        }
        tracing::info!(files = discovered, "discovery complete");

        let pool_report = pool.shutdown(&self.cancel).await;
        let queue_report = queue.close(&self.cancel).await;

        self.store
            .close()
            .await
            .map_err(|e| Error::Store(format!("failed to close store: {e}")))?;

        let summary = RunSummary {
            files_discovered: discovered,
            files_extracted: pool_report.extracted,
            files_skipped_generated: pool_report.skipped_generated,
            files_failed: pool_report.failed,
            records_submitted: queue_report.submitted,
            records_stored: queue_report.stored,
            records_failed: queue_report.failed,
            interrupted: pool_report.interrupted || queue_report.interrupted,
        };
        tracing::info!(
            files = summary.files_discovered,
            extracted = summary.total_extracted(),
            failed = summary.files_failed,
            records = summary.records_stored,
            "ingestion finished"
        );
        Ok(summary)
    }
}
