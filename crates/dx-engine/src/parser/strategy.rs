use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use super::{Grammar, LegacyJava, ModernJava, ParseFailure, ParsedUnit, PredictionMode};

/// Steps of the per-file parse decision procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Unattempted,
    TryPrimaryFast,
    TryPrimaryExhaustive,
    TryLegacy,
    Succeeded,
    Failed,
}

impl ParseState {
    /// Where to go after a failed attempt in this state.
    pub fn on_failure(self, failure: &ParseFailure) -> Self {
        match self {
            Self::TryPrimaryFast if failure.is_recoverable() => Self::TryPrimaryExhaustive,
            Self::TryPrimaryFast | Self::TryPrimaryExhaustive => Self::TryLegacy,
            _ => Self::Failed,
        }
    }
}

pub struct ParseSuccess {
    pub unit: ParsedUnit,
    pub grammar: &'static str,
    pub trace: Vec<ParseState>,
}

#[derive(Error, Debug)]
#[error("all parse strategies exhausted: {last}")]
pub struct StrategyExhausted {
    pub trace: Vec<ParseState>,
    pub last: ParseFailure,
}

/// Primary grammar first (fast, then exhaustive), legacy grammar last.
pub struct ParseStrategy {
    primary: Box<dyn Grammar>,
    legacy: Box<dyn Grammar>,
}

impl Default for ParseStrategy {
    fn default() -> Self {
        Self::new(Box::new(ModernJava::default()), Box::new(LegacyJava))
    }
}

impl ParseStrategy {
    pub fn new(primary: Box<dyn Grammar>, legacy: Box<dyn Grammar>) -> Self {
        Self { primary, legacy }
    }

    /// A panicking grammar counts as an unrecoverable fault.
    fn attempt(grammar: &dyn Grammar, source: &str, mode: PredictionMode) -> Result<ParsedUnit, ParseFailure> {
        panic::catch_unwind(AssertUnwindSafe(|| grammar.parse(source, mode))).unwrap_or_else(|_| {
            Err(ParseFailure::Fault(format!("{} grammar panicked", grammar.name())))
        })
    }

    pub fn parse(&self, source: &str, file: &str) -> Result<ParseSuccess, StrategyExhausted> {
        let mut trace = vec![ParseState::Unattempted];
        let mut state = ParseState::TryPrimaryFast;
        let mut last = None;

        loop {
            trace.push(state);
            let (grammar, mode) = match state {
                ParseState::TryPrimaryFast => (self.primary.as_ref(), PredictionMode::Fast),
                ParseState::TryPrimaryExhaustive => (self.primary.as_ref(), PredictionMode::Exhaustive),
                ParseState::TryLegacy => (self.legacy.as_ref(), PredictionMode::Exhaustive),
                _ => break,
            };

            match Self::attempt(grammar, source, mode) {
                Ok(unit) => {
                    trace.push(ParseState::Succeeded);
                    return Ok(ParseSuccess {
                        unit,
                        grammar: grammar.name(),
                        trace,
                    });
                }
                Err(failure) => {
                    let next = state.on_failure(&failure);
                    match next {
                        ParseState::TryPrimaryExhaustive => tracing::debug!(
                            file,
                            error = %failure,
                            "fast parse failed, retrying exhaustively"
                        ),
                        ParseState::TryLegacy => tracing::info!(
                            file,
                            error = %failure,
                            "{} grammar failed, falling back to {}",
                            grammar.name(),
                            self.legacy.name()
                        ),
                        _ => {}
                    }
                    last = Some(failure);
                    state = next;
                }
            }
        }

        Err(StrategyExhausted {
            trace,
            last: last.unwrap_or_else(|| ParseFailure::Fault("no grammar attempted".into())),
        })
    }
}
