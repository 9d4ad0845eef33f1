use std::path::Path;
use std::sync::Arc;

use dx_core::{DeclarationRecord, Error, ProjectIdentity, Result};

use super::generated::GeneratedCodeDetector;
use crate::extract::extract_declarations;
use crate::parser::ParseStrategy;

/// What one file contributed to the run.
pub enum FileOutcome {
    Extracted {
        grammar: &'static str,
        records: Vec<DeclarationRecord>,
    },
    SkippedGenerated,
}

/// Per-file work shared by all parse tasks. Holds nothing mutable: every
/// call builds its own tracker and tables.
pub struct FileWorker {
    identity: Arc<ProjectIdentity>,
    strategy: ParseStrategy,
    detector: GeneratedCodeDetector,
    include_generated: bool,
}

impl FileWorker {
    pub fn new(identity: Arc<ProjectIdentity>, include_generated: bool) -> Self {
        Self::with_strategy(identity, include_generated, ParseStrategy::default())
    }

    pub fn with_strategy(
        identity: Arc<ProjectIdentity>,
        include_generated: bool,
        strategy: ParseStrategy,
    ) -> Self {
        Self {
            identity,
            strategy,
            detector: GeneratedCodeDetector::new(),
            include_generated,
        }
    }

    /// Reads, screens, parses and walks one file. Blocking.
    pub fn process(&self, path: &Path) -> Result<FileOutcome> {
        let bytes = std::fs::read(path)?;
        let decoded = String::from_utf8_lossy(&bytes);
        let source = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);
        let path_str = path.display().to_string();

        if !self.include_generated && self.detector.is_generated(source) {
            tracing::info!(file = %path_str, "skipping generated file");
            return Ok(FileOutcome::SkippedGenerated);
        }

        let parsed = self
            .strategy
            .parse(source, &path_str)
            .map_err(|e| Error::ParseError(format!("{path_str}: {e}")))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone());
        let records = extract_declarations(&parsed.unit.root(source), self.identity.clone(), &file_name);
        tracing::debug!(file = %path_str, grammar = parsed.grammar, records = records.len(), "extracted");

        Ok(FileOutcome::Extracted {
            grammar: parsed.grammar,
            records,
        })
    }
}
