pub mod java;
pub mod legacy;
pub mod strategy;

use thiserror::Error;

pub use java::{JavaNode, ModernJava};
pub use legacy::LegacyJava;
pub use strategy::{ParseState, ParseStrategy, ParseSuccess, StrategyExhausted};

/// How hard a grammar should try before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    /// Cheap attempt under a time budget.
    Fast,
    /// Fresh parser state, no budget.
    Exhaustive,
}

#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },

    #[error("parse budget exhausted")]
    BudgetExhausted,

    #[error("grammar fault: {0}")]
    Fault(String),
}

impl ParseFailure {
    /// Whether a retry with the same grammar in exhaustive mode makes sense.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::BudgetExhausted)
    }
}

/// An error-free syntax tree. Node text is always read from the caller's
/// original source, never from whatever text the grammar actually parsed.
pub struct ParsedUnit {
    tree: tree_sitter::Tree,
    grammar: &'static str,
}

impl ParsedUnit {
    pub(crate) fn new(tree: tree_sitter::Tree, grammar: &'static str) -> Self {
        Self { tree, grammar }
    }

    pub fn grammar(&self) -> &'static str {
        self.grammar
    }

    pub fn root<'a>(&'a self, source: &'a str) -> JavaNode<'a> {
        JavaNode::new(self.tree.root_node(), source)
    }
}

/// A grammar generation able to turn Java source into a [`ParsedUnit`].
pub trait Grammar: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse(&self, source: &str, mode: PredictionMode) -> Result<ParsedUnit, ParseFailure>;
}
