use std::path::Path;

use anyhow::{Context, Result};
use dx_engine::IngestConfig;

/// Values given on the command line. Anything set here wins over the
/// configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub project: Option<String>,
    pub project_version: Option<String>,
    pub include_generated: bool,
    pub include_tests: bool,
    pub threads: Option<(usize, usize)>,
}

/// Reads an optional TOML file holding [`IngestConfig`] fields.
pub fn load(path: Option<&Path>) -> Result<IngestConfig> {
    let Some(path) = path else {
        return Ok(IngestConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&content).context("failed to parse config file")
}

pub fn merge(mut config: IngestConfig, overrides: Overrides) -> Result<IngestConfig> {
    if let Some(project) = overrides.project {
        config.project_name = project;
    }
    if let Some(version) = overrides.project_version {
        config.project_version = version;
    }
    config.include_generated |= overrides.include_generated;
    config.include_tests |= overrides.include_tests;
    if let Some((min, max)) = overrides.threads {
        config.min_workers = min;
        config.max_workers = max;
    }

    if config.project_name.trim().is_empty() {
        return Err(dx_core::Error::InvalidConfig("a project name is required (--project)".into()).into());
    }
    if config.project_version.trim().is_empty() {
        return Err(
            dx_core::Error::InvalidConfig("a project version is required (--project-version)".into()).into(),
        );
    }
    Ok(config.validated())
}
