use dx_core::{DeclarationKind, DeclarationRecord, Modifier, ModifierSet, ProjectIdentity, SourceSpan};
use dx_engine::{RecordStore, SqliteStore};
use sqlx::Row;

fn method() -> DeclarationRecord {
    DeclarationRecord {
        source_file: "Service.java".into(),
        package_name: "org.example".into(),
        parent_id: "abc-1".into(),
        own_id: "abc-2".into(),
        name: "handle".into(),
        kind: DeclarationKind::Method,
        type_name: "java.util.List<String>".into(),
        is_array: false,
        signature: Some("(int;String...;)".into()),
        modifiers: ModifierSet::from([Modifier::Static, Modifier::Private]),
        is_loop_control_variable: false,
        superclasses: Vec::new(),
        supertypes: Vec::new(),
        span: SourceSpan {
            start_line: 3,
            start_column: 5,
            end_line: 7,
            end_column: 5,
        },
    }
}

fn class() -> DeclarationRecord {
    DeclarationRecord {
        own_id: "abc-1".into(),
        parent_id: "root".into(),
        name: "Service".into(),
        kind: DeclarationKind::Class,
        type_name: "org.example.Service".into(),
        signature: None,
        modifiers: ModifierSet::new(),
        superclasses: vec!["org.example.Base".into()],
        supertypes: vec!["Runnable".into(), "java.io.Closeable".into()],
        ..method()
    }
}

#[tokio::test]
async fn stores_one_row_per_record() {
    let store = SqliteStore::open_in_memory(&ProjectIdentity::new("demo", "1.0"))
        .await
        .unwrap();
    store.store(&class()).await.unwrap();
    store.store(&method()).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM declarations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 2);

    let row = sqlx::query(
        "SELECT kind, modifiers, signature, is_array, start_line, end_column FROM declarations WHERE own_id = 'abc-2'",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>("kind"), "method");
    assert_eq!(row.get::<String, _>("modifiers"), "private static");
    assert_eq!(row.get::<Option<String>, _>("signature").as_deref(), Some("(int;String...;)"));
    assert!(!row.get::<bool, _>("is_array"));
    assert_eq!(row.get::<i64, _>("start_line"), 3);
    assert_eq!(row.get::<i64, _>("end_column"), 5);

    let row = sqlx::query("SELECT signature, superclasses, supertypes FROM declarations WHERE own_id = 'abc-1'")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert!(row.get::<Option<String>, _>("signature").is_none());
    let supertypes: Vec<String> = serde_json::from_str(&row.get::<String, _>("supertypes")).unwrap();
    assert_eq!(supertypes, vec!["Runnable", "java.io.Closeable"]);
    assert_eq!(row.get::<String, _>("superclasses"), r#"["org.example.Base"]"#);
}

#[tokio::test]
async fn registers_the_run_and_stamps_completion() {
    let store = SqliteStore::open_in_memory(&ProjectIdentity::new("demo", "2.1"))
        .await
        .unwrap();
    let row = sqlx::query("SELECT project_name, project_version, completed_at FROM runs WHERE run_id = ?")
        .bind(store.run_id().to_string())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("project_name"), "demo");
    assert_eq!(row.get::<String, _>("project_version"), "2.1");
    assert!(row.get::<Option<String>, _>("completed_at").is_none());

    store.close().await.unwrap();
    assert!(store.pool().is_closed());
}

#[tokio::test]
async fn duplicate_ids_within_a_run_are_rejected() {
    let store = SqliteStore::open_in_memory(&ProjectIdentity::new("demo", "1.0"))
        .await
        .unwrap();
    store.store(&method()).await.unwrap();
    assert!(store.store(&method()).await.is_err());
}

#[tokio::test]
async fn reopening_a_database_file_adds_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decls.db");
    let identity = ProjectIdentity::new("demo", "1.0");

    let first = SqliteStore::open(&path, &identity).await.unwrap();
    first.store(&method()).await.unwrap();
    first.close().await.unwrap();

    let second = SqliteStore::open(&path, &identity).await.unwrap();
    second.store(&method()).await.unwrap();

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM runs")
        .fetch_one(second.pool())
        .await
        .unwrap();
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM declarations")
        .fetch_one(second.pool())
        .await
        .unwrap();
    assert_eq!((runs, rows), (2, 2));
    second.close().await.unwrap();
}
