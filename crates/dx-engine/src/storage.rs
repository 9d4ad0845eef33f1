//! Record store abstraction.
//!
//! Stores are driven by the persistence queue's single consumer task, so an
//! implementation never sees concurrent `store` calls.

use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use dx_core::{DeclarationRecord, Error, ProjectIdentity, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

/// Trait for declaration record sinks.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn store(&self, record: &DeclarationRecord) -> anyhow::Result<()>;
    async fn close(&self) -> anyhow::Result<()>;
}

/// In-process store, mostly for tests and embedders.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<DeclarationRecord>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DeclarationRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn store(&self, record: &DeclarationRecord) -> anyhow::Result<()> {
        if self.is_closed() {
            anyhow::bail!("store is closed");
        }
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// SQLite-backed store. Each instance registers one run row and tags every
/// declaration it writes with that run's id.
pub struct SqliteStore {
    pool: SqlitePool,
    run_id: Uuid,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn open(path: &Path, identity: &ProjectIdentity) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options, identity).await
    }

    pub async fn open_in_memory(identity: &ProjectIdentity) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, identity).await
    }

    async fn connect(options: SqliteConnectOptions, identity: &ProjectIdentity) -> Result<Self> {
        // One long-lived connection: writes are serialized anyway, and an
        // in-memory database lives exactly as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Store(format!("migration failed: {e}")))?;

        let run_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO runs (run_id, project_name, project_version, started_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(run_id.to_string())
        .bind(&identity.name)
        .bind(&identity.version)
        .bind(Utc::now())
        .execute(&pool)
        .await?;

        tracing::info!(%run_id, project = %identity.name, version = %identity.version, "registered run");
        Ok(Self { pool, run_id })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    async fn insert(&self, record: &DeclarationRecord) -> Result<()> {
        let modifiers = record
            .modifiers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let superclasses = serde_json::to_string(&record.superclasses)?;
        let supertypes = serde_json::to_string(&record.supertypes)?;

        sqlx::query(
            r#"INSERT INTO declarations
               (run_id, own_id, parent_id, source_file, package_name, name, kind,
                type_name, is_array, signature, modifiers, is_loop_control,
                superclasses, supertypes, start_line, start_column, end_line, end_column)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(self.run_id.to_string())
        .bind(&record.own_id)
        .bind(&record.parent_id)
        .bind(&record.source_file)
        .bind(&record.package_name)
        .bind(&record.name)
        .bind(record.kind.to_string())
        .bind(&record.type_name)
        .bind(record.is_array)
        .bind(&record.signature)
        .bind(modifiers)
        .bind(record.is_loop_control_variable)
        .bind(superclasses)
        .bind(supertypes)
        .bind(record.span.start_line)
        .bind(record.span.start_column)
        .bind(record.span.end_line)
        .bind(record.span.end_column)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn store(&self, record: &DeclarationRecord) -> anyhow::Result<()> {
        Ok(self.insert(record).await?)
    }

    async fn close(&self) -> anyhow::Result<()> {
        sqlx::query("UPDATE runs SET completed_at = ? WHERE run_id = ?")
            .bind(Utc::now())
            .bind(self.run_id.to_string())
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        tracing::info!(run_id = %self.run_id, "closed store");
        Ok(())
    }
}
