use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use dx_core::DeclarationKind;
use dx_engine::{IngestConfig, Ingestion, MemoryStore, RecordStore, SqliteStore};
use sqlx::sqlite::SqlitePool;
use tokio_util::sync::CancellationToken;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn corpus(root: &Path) {
    write(root, "src/org/a/A.java", "package org.a;\nclass A { int x; }\n");
    write(
        root,
        "src/org/a/B.java",
        "package org.a;\nimport java.util.List;\nclass B { List<A> items; void m(int n) { for (int i = 0; i < n; i++) {} } }\n",
    );
    write(root, "src/org/a/Broken.java", "package org.a;\nclass Broken {\n");
    write(
        root,
        "src/org/a/Legacy.java",
        "package org.a;\nclass Legacy { java.util.Enumeration enum; void reset(java.util.Vector v) { enum = v.elements(); } }\n",
    );
    write(
        root,
        "src/org/a/Gen.java",
        "// Generated by the protocol buffer compiler.  DO NOT EDIT!\nclass Gen {}\n",
    );
    write(root, "src/org/a/package-info.java", "package org.a;\n");
    write(root, "src/test/T.java", "class T {}\n");
    write(root, ".idea/Hidden.java", "class Hidden {}\n");
}

fn config() -> IngestConfig {
    let mut config = IngestConfig::new("demo", "1.0");
    config.min_workers = 2;
    config.max_workers = 4;
    config.queue_capacity = 4;
    config.progress_interval_ms = 10;
    config
}

#[tokio::test]
async fn run_extracts_siblings_of_a_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    corpus(dir.path());

    let store = Arc::new(MemoryStore::new());
    let ingestion = Ingestion::new(config(), store.clone());
    let summary = ingestion.run(&[dir.path().to_path_buf()]).await.unwrap();

    assert_eq!(summary.files_discovered, 5);
    assert_eq!(summary.files_extracted.get("modern"), Some(&2));
    assert_eq!(summary.files_extracted.get("legacy"), Some(&1));
    assert_eq!(summary.files_skipped_generated, 1);
    assert_eq!(summary.files_failed, 1);
    assert!(!summary.interrupted);
    assert!(store.is_closed());

    let records = store.records();
    assert_eq!(summary.records_submitted, records.len() as u64);
    assert_eq!(summary.records_stored, records.len() as u64);

    let files: HashSet<&str> = records.iter().map(|r| r.source_file.as_str()).collect();
    assert_eq!(files, HashSet::from(["A.java", "B.java", "Legacy.java"]));

    let ids: HashSet<&str> = records.iter().map(|r| r.own_id.as_str()).collect();
    assert_eq!(ids.len(), records.len());

    let items = records.iter().find(|r| r.name == "items").unwrap();
    assert_eq!(items.type_name, "java.util.List<A>");
    let i = records
        .iter()
        .find(|r| r.name == "i" && r.kind == DeclarationKind::LocalVariable)
        .unwrap();
    assert!(i.is_loop_control_variable);
}

#[tokio::test]
async fn tests_and_generated_code_can_be_included() {
    let dir = tempfile::tempdir().unwrap();
    corpus(dir.path());

    let mut config = config();
    config.include_tests = true;
    config.include_generated = true;
    let store = Arc::new(MemoryStore::new());
    let summary = Ingestion::new(config, store.clone())
        .run(&[dir.path().to_path_buf()])
        .await
        .unwrap();

    assert_eq!(summary.files_discovered, 6);
    assert_eq!(summary.files_skipped_generated, 0);
    assert_eq!(summary.total_extracted(), 5);
    let names: HashSet<String> = store.records().into_iter().map(|r| r.name).collect();
    assert!(names.contains("Gen"));
    assert!(names.contains("T"));
    assert!(!names.contains("Hidden"));
}

#[tokio::test]
async fn interruption_forces_shutdown_and_still_closes_the_store() {
    let dir = tempfile::tempdir().unwrap();
    corpus(dir.path());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let store = Arc::new(MemoryStore::new());
    let summary = Ingestion::new(config(), store.clone())
        .with_cancellation(cancel)
        .run(&[dir.path().to_path_buf()])
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert!(store.is_closed());
}

#[tokio::test]
async fn sqlite_run_persists_every_submitted_record() {
    let dir = tempfile::tempdir().unwrap();
    corpus(dir.path());
    let db_path = dir.path().join("out").join("decls.db");
    std::fs::create_dir_all(db_path.parent().unwrap()).unwrap();

    let config = config();
    let identity = dx_core::ProjectIdentity::new(&config.project_name, &config.project_version);
    let store = Arc::new(SqliteStore::open(&db_path, &identity).await.unwrap());
    let run_id = store.run_id();
    let store: Arc<dyn RecordStore> = store;
    let summary = Ingestion::new(config, store)
        .run(&[dir.path().join("src")])
        .await
        .unwrap();

    let pool = SqlitePool::connect(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();
    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM declarations WHERE run_id = ?")
        .bind(run_id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored as u64, summary.records_submitted);
    assert!(stored > 0);

    let completed: Option<String> = sqlx::query_scalar("SELECT completed_at FROM runs WHERE run_id = ?")
        .bind(run_id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(completed.is_some());
}
