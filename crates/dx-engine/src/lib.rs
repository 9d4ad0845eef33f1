pub mod extract;
pub mod parser;
pub mod pipeline;
pub mod storage;

pub use pipeline::{IngestConfig, Ingestion, RunSummary};
pub use storage::{MemoryStore, RecordStore, SqliteStore};
