use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_WORKERS: usize = 10;
pub const DEFAULT_MAX_WORKERS: usize = 20;
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 2000;

/// Settings consumed by one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub project_name: String,
    pub project_version: String,
    pub min_workers: usize,
    pub max_workers: usize,
    pub include_generated: bool,
    pub include_tests: bool,
    /// Records the persistence queue buffers before producers wait.
    pub queue_capacity: usize,
    /// Interval between drain progress reports.
    pub progress_interval_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            project_version: String::new(),
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            include_generated: false,
            include_tests: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
        }
    }
}

impl IngestConfig {
    pub fn new(project_name: impl Into<String>, project_version: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            project_version: project_version.into(),
            ..Default::default()
        }
    }

    /// Replaces irrational settings with defaults. Worker bounds are reset as
    /// a pair when either is zero or they are inverted.
    pub fn validated(mut self) -> Self {
        if self.min_workers == 0 || self.max_workers == 0 || self.min_workers > self.max_workers {
            tracing::info!(
                min = self.min_workers,
                max = self.max_workers,
                "invalid worker bounds, using {DEFAULT_MIN_WORKERS}..{DEFAULT_MAX_WORKERS}"
            );
            self.min_workers = DEFAULT_MIN_WORKERS;
            self.max_workers = DEFAULT_MAX_WORKERS;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        if self.progress_interval_ms == 0 {
            self.progress_interval_ms = DEFAULT_PROGRESS_INTERVAL_MS;
        }
        self
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irrational_bounds_fall_back_to_defaults() {
        let mut config = IngestConfig::new("p", "1");
        config.min_workers = 8;
        config.max_workers = 4;
        let config = config.validated();
        assert_eq!((config.min_workers, config.max_workers), (10, 20));

        let mut zero = IngestConfig::new("p", "1");
        zero.min_workers = 0;
        assert_eq!(zero.validated().min_workers, DEFAULT_MIN_WORKERS);
    }

    #[test]
    fn sane_bounds_are_kept() {
        let mut config = IngestConfig::new("p", "1");
        config.min_workers = 2;
        config.max_workers = 2;
        let config = config.validated();
        assert_eq!((config.min_workers, config.max_workers), (2, 2));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: IngestConfig =
            serde_json::from_str(r#"{"project_name":"demo","include_tests":true}"#).unwrap();
        assert_eq!(config.project_name, "demo");
        assert!(config.include_tests);
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.progress_interval(), Duration::from_secs(2));
    }
}
