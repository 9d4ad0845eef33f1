use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dx_core::{DeclarationRecord, Error, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::storage::RecordStore;

#[derive(Debug, Default)]
struct QueueStats {
    submitted: AtomicU64,
    stored: AtomicU64,
    failed: AtomicU64,
}

/// Counters of a drained queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub submitted: u64,
    pub stored: u64,
    pub failed: u64,
    pub interrupted: bool,
}

/// Producer side of the persistence queue.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<DeclarationRecord>,
    stats: Arc<QueueStats>,
}

impl QueueHandle {
    /// Enqueues one record for writing, waiting while the queue is full.
    pub async fn add(&self, record: DeclarationRecord) -> Result<()> {
        self.tx
            .send(record)
            .await
            .map_err(|_| Error::Store("persistence queue is closed".into()))?;
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Bounded many-producer queue drained by a single writer task, so the
/// store only ever sees one write at a time.
pub struct PersistenceQueue {
    handle: QueueHandle,
    consumer: JoinHandle<()>,
    progress_interval: Duration,
}

impl PersistenceQueue {
    pub fn start(store: Arc<dyn RecordStore>, capacity: usize, progress_interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(QueueStats::default());
        let consumer = tokio::spawn(Self::consume(rx, store, stats.clone()));
        Self {
            handle: QueueHandle { tx, stats },
            consumer,
            progress_interval,
        }
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    async fn consume(
        mut rx: mpsc::Receiver<DeclarationRecord>,
        store: Arc<dyn RecordStore>,
        stats: Arc<QueueStats>,
    ) {
        while let Some(record) = rx.recv().await {
            match store.store(&record).await {
                Ok(()) => {
                    stats.stored.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        file = %record.source_file,
                        own_id = %record.own_id,
                        error = %e,
                        "failed to store declaration"
                    );
                }
            }
        }
    }

    fn report(stats: &QueueStats, interrupted: bool) -> QueueReport {
        QueueReport {
            submitted: stats.submitted.load(Ordering::Relaxed),
            stored: stats.stored.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            interrupted,
        }
    }

    /// Stops accepting records and waits for the writer to drain.
    ///
    /// Handles cloned from this queue must already be dropped, otherwise the
    /// drain only ends through `cancel`, which abandons whatever is still
    /// queued.
    pub async fn close(self, cancel: &CancellationToken) -> QueueReport {
        let Self {
            handle,
            mut consumer,
            progress_interval,
        } = self;
        let QueueHandle { tx, stats } = handle;
        drop(tx);

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + progress_interval,
            progress_interval,
        );
        let interrupted = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    consumer.abort();
                    let report = Self::report(&stats, true);
                    tracing::warn!(
                        abandoned = report.submitted.saturating_sub(report.stored + report.failed),
                        "persistence queue interrupted, forcing shutdown"
                    );
                    break true;
                }
                result = &mut consumer => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "persistence writer stopped abnormally");
                    }
                    break false;
                }
                _ = ticker.tick() => {
                    let report = Self::report(&stats, false);
                    let done = report.stored + report.failed;
                    tracing::info!(
                        queued = report.submitted.saturating_sub(done),
                        completed_pct = percent(done, report.submitted),
                        "draining persistence queue"
                    );
                }
            }
        };

        Self::report(&stats, interrupted)
    }
}

pub(crate) fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        100
    } else {
        done * 100 / total
    }
}
