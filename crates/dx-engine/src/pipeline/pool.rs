use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::file_task::{FileOutcome, FileWorker};
use super::queue::{percent, QueueHandle};

#[derive(Debug, Default)]
struct PoolStats {
    submitted: AtomicU64,
    started: AtomicU64,
    finished: AtomicU64,
    skipped_generated: AtomicU64,
    failed: AtomicU64,
    extracted: Mutex<BTreeMap<&'static str, u64>>,
}

impl PoolStats {
    fn record_extracted(&self, grammar: &'static str) {
        let mut extracted = self
            .extracted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *extracted.entry(grammar).or_default() += 1;
    }
}

/// Counters of a drained pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub submitted: u64,
    pub extracted: BTreeMap<String, u64>,
    pub skipped_generated: u64,
    pub failed: u64,
    pub interrupted: bool,
}

/// Bounded pool of parse tasks.
///
/// `submit` never waits: each file becomes a task that first acquires one of
/// `max_workers` permits, then parses on the blocking thread pool and hands
/// its records to the persistence queue.
pub struct ParsePool {
    tasks: JoinSet<()>,
    permits: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    worker: Arc<FileWorker>,
    queue: QueueHandle,
    progress_interval: Duration,
}

impl ParsePool {
    pub fn new(
        max_workers: usize,
        worker: Arc<FileWorker>,
        queue: QueueHandle,
        progress_interval: Duration,
    ) -> Self {
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
            stats: Arc::new(PoolStats::default()),
            worker,
            queue,
            progress_interval,
        }
    }

    pub fn submit(&mut self, path: PathBuf) {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        let permits = self.permits.clone();
        let stats = self.stats.clone();
        let worker = self.worker.clone();
        let queue = self.queue.clone();

        self.tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            stats.started.fetch_add(1, Ordering::Relaxed);
            let path_str = path.display().to_string();

            match tokio::task::spawn_blocking(move || worker.process(&path)).await {
                Ok(Ok(FileOutcome::Extracted { grammar, records })) => {
                    stats.record_extracted(grammar);
                    for record in records {
                        if let Err(e) = queue.add(record).await {
                            tracing::warn!(file = %path_str, error = %e, "dropping remaining records");
                            break;
                        }
                    }
                }
                Ok(Ok(FileOutcome::SkippedGenerated)) => {
                    stats.skipped_generated.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(file = %path_str, error = %e, "failed to extract declarations");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(file = %path_str, error = %e, "parse task aborted");
                }
            }
            stats.finished.fetch_add(1, Ordering::Relaxed);
        });
    }

    fn report(&self, interrupted: bool) -> PoolReport {
        let extracted = self
            .stats
            .extracted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(grammar, count)| (grammar.to_string(), *count))
            .collect();
        PoolReport {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            extracted,
            skipped_generated: self.stats.skipped_generated.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            interrupted,
        }
    }

    fn log_progress(&self) {
        let submitted = self.stats.submitted.load(Ordering::Relaxed);
        let started = self.stats.started.load(Ordering::Relaxed);
        let finished = self.stats.finished.load(Ordering::Relaxed);
        tracing::info!(
            queued = submitted.saturating_sub(started),
            running = started.saturating_sub(finished),
            completed_pct = percent(finished, submitted),
            "draining parse pool"
        );
    }

    /// Closes the pool to new files and waits for every task, reporting
    /// progress on each tick. Cancellation aborts whatever has not finished.
    pub async fn shutdown(mut self, cancel: &CancellationToken) -> PoolReport {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.progress_interval,
            self.progress_interval,
        );
        let interrupted = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.tasks.abort_all();
                    tracing::warn!(
                        unfinished = self.tasks.len(),
                        "parse pool interrupted, forcing shutdown"
                    );
                    break true;
                }
                next = self.tasks.join_next() => match next {
                    Some(Err(e)) if e.is_panic() => {
                        tracing::warn!(error = %e, "parse task panicked");
                    }
                    Some(_) => {}
                    None => break false,
                },
                _ = ticker.tick() => self.log_progress(),
            }
        };

        self.report(interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::PersistenceQueue;
    use crate::storage::MemoryStore;
    use dx_core::ProjectIdentity;

    #[tokio::test]
    async fn drains_all_files_and_counts_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..12 {
            let path = dir.path().join(format!("C{i}.java"));
            std::fs::write(&path, format!("class C{i} {{ int x; }}")).unwrap();
            paths.push(path);
        }
        let broken = dir.path().join("Broken.java");
        std::fs::write(&broken, "class Broken {").unwrap();
        paths.push(broken);

        let store = Arc::new(MemoryStore::new());
        let queue = PersistenceQueue::start(store.clone(), 8, Duration::from_millis(20));
        let worker = Arc::new(FileWorker::new(Arc::new(ProjectIdentity::new("p", "1")), false));
        let mut pool = ParsePool::new(3, worker, queue.handle(), Duration::from_millis(20));
        for path in paths {
            pool.submit(path);
        }

        let report = pool.shutdown(&CancellationToken::new()).await;
        assert_eq!(report.submitted, 13);
        assert_eq!(report.extracted.get("modern"), Some(&12));
        assert_eq!(report.failed, 1);
        assert!(!report.interrupted);

        let queued = queue.close(&CancellationToken::new()).await;
        assert_eq!(queued.stored, 24);
        assert_eq!(store.records().len(), 24);
    }
}
