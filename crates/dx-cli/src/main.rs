mod config;
mod util;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dx_core::ProjectIdentity;
use dx_engine::{IngestConfig, Ingestion, RunSummary, SqliteStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Worker threads parse deeply nested sources recursively.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Exit status for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "dx", about = "Extract Java declarations into a SQLite database")]
struct Cli {
    /// SQLite database file to write into
    #[arg(short, long, env = "DX_DATABASE")]
    database: PathBuf,

    /// Project name stamped into every identifier
    #[arg(short, long)]
    project: Option<String>,

    /// Project version stamped into every identifier
    #[arg(short = 'v', long)]
    project_version: Option<String>,

    /// Also extract files that look machine generated
    #[arg(short = 'g', long)]
    include_generated: bool,

    /// Also descend into test directories
    #[arg(short = 't', long)]
    include_tests: bool,

    /// Lower bound of the parse pool
    #[arg(long, requires = "max_threads")]
    min_threads: Option<usize>,

    /// Upper bound of the parse pool
    #[arg(long, requires = "min_threads")]
    max_threads: Option<usize>,

    /// Log progress at info level
    #[arg(short = 'V', long)]
    verbose: bool,

    /// TOML file with ingestion settings
    #[arg(long, env = "DX_CONFIG")]
    config: Option<PathBuf>,

    /// Source files or directories to scan
    #[arg(required = true)]
    paths: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "dx=info" } else { "dx=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::merge(
        config::load(cli.config.as_deref())?,
        config::Overrides {
            project: cli.project,
            project_version: cli.project_version,
            include_generated: cli.include_generated,
            include_tests: cli.include_tests,
            threads: cli.min_threads.zip(cli.max_threads),
        },
    )?;
    let roots = util::source_roots(&cli.paths)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.min_workers)
        .max_blocking_threads(config.max_workers)
        .thread_stack_size(WORKER_STACK_SIZE)
        .thread_name("dx-worker")
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    let summary = runtime.block_on(run(config, cli.database, roots))?;
    runtime.shutdown_timeout(Duration::from_secs(5));

    print!("{summary}");
    if summary.interrupted {
        std::process::exit(EXIT_INTERRUPTED);
    }
    Ok(())
}

async fn run(config: IngestConfig, database: PathBuf, roots: Vec<PathBuf>) -> Result<RunSummary> {
    let identity = ProjectIdentity::new(config.project_name.clone(), config.project_version.clone());
    let store = SqliteStore::open(&database, &identity)
        .await
        .with_context(|| format!("failed to open database {}", database.display()))?;
    tracing::info!(
        database = %database.display(),
        run_id = %store.run_id(),
        project = %identity.name,
        version = %identity.version,
        "store opened"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, shutting down");
            on_signal.cancel();
        }
    });

    let summary = Ingestion::new(config, Arc::new(store))
        .with_cancellation(cancel)
        .run(&roots)
        .await?;
    Ok(summary)
}
