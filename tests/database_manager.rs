use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rusqlite::params;
use sqlkeeper::{
    Clause, ConnectionSettings, DatabaseManager, ExecError, Failure, KeeperConfig, Operation,
    RetryDecision, TableConfig,
};
use tempfile::TempDir;

// Manager over a fresh file with the `users` table declared
fn create_manager(dir: &TempDir) -> DatabaseManager {
    let mut db = DatabaseManager::open(
        dir.path().join("database.sqlite"),
        ConnectionSettings::default(),
        true,
    )
    .unwrap();
    db.register_table("users", "users (id INTEGER PRIMARY KEY, name TEXT)")
        .unwrap();
    db
}

#[test]
fn test_users_scenario() {
    let dir = TempDir::new().unwrap();
    let db = create_manager(&dir);

    db.ensure_open().unwrap();
    db.ensure_open().unwrap();
    assert_eq!(db.controller().open_count(), 1);

    let report = db.reconcile_tables().unwrap();
    assert_eq!(report.created, vec!["users"]);
    assert!(db.verify_tables().unwrap());

    let id = db
        .executor()
        .insert("users", &["name"], params!["Alice"])
        .unwrap();
    assert_eq!(id, 1);

    let mut rows = db
        .executor()
        .select(&["name"], "users", &Clause::new("WHERE id = ?").bind(1))
        .unwrap();
    let row = rows.next().unwrap();
    assert_eq!(row.get_by_name::<String>("name").unwrap(), "Alice");
    assert!(rows.next().is_none());
    rows.close();

    db.close();
    db.close();
    assert!(!db.controller().is_open());
}

#[test]
fn test_reconcile_is_idempotent_across_managers() {
    let dir = TempDir::new().unwrap();
    {
        let db = create_manager(&dir);
        assert_eq!(db.reconcile_tables().unwrap().created, vec!["users"]);
    }

    let db = create_manager(&dir);
    let report = db.reconcile_tables().unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.present, vec!["users"]);
}

#[test]
fn test_crud_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = create_manager(&dir);
    db.reconcile_tables().unwrap();
    let exec = db.executor();

    for name in ["Alice", "Bob", "Carol"] {
        exec.insert("users", &["name"], params![name]).unwrap();
    }

    let updated = exec
        .update(
            "users",
            &Clause::new("name = ?").bind("Robert".to_string()),
            &Clause::new("WHERE name = ?").bind("Bob".to_string()),
        )
        .unwrap();
    assert_eq!(updated, 1);

    let deleted = exec
        .delete("users", &Clause::new("id = ?").bind(1))
        .unwrap();
    assert_eq!(deleted, 1);

    let names: Vec<String> = exec
        .select(&["name"], "users", &Clause::new("ORDER BY id"))
        .unwrap()
        .map(|row| row.get::<String>(0).unwrap())
        .collect();
    assert_eq!(names, vec!["Robert", "Carol"]);
}

#[test]
fn test_policy_sees_failure_context() {
    let dir = TempDir::new().unwrap();
    let seen = Arc::new(AtomicU32::new(0));
    let counter = seen.clone();

    let db = create_manager(&dir).with_policy(move |failure: &Failure<'_>| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(failure.operation, Operation::Select);
        assert!(failure.message.contains("no such table"));
        RetryDecision::Retry
    });

    let err = db
        .executor()
        .select(&[], "ghosts", &Clause::empty())
        .unwrap_err();
    assert!(matches!(err, ExecError::Statement { attempts: 3, .. }));
    // no decision is requested once the bound is reached
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_backup_restore_purge_flow() {
    let dir = TempDir::new().unwrap();
    let db = create_manager(&dir);
    db.reconcile_tables().unwrap();
    db.executor()
        .insert("users", &["name"], params!["Alice"])
        .unwrap();

    let snapshot = db.backup(None).unwrap().unwrap();
    assert!(snapshot.ends_with(".sqlite"));
    assert_eq!(db.most_recent_backup().unwrap(), Some(snapshot.clone()));

    db.executor()
        .delete("users", &Clause::new("name = ?").bind("Alice".to_string()))
        .unwrap();

    db.restore_backup(&snapshot).unwrap();
    let count = db
        .executor()
        .select(&["id"], "users", &Clause::empty())
        .unwrap()
        .count();
    assert_eq!(count, 1);

    assert_eq!(db.purge_backups(36500).unwrap(), 0);
    assert!(db.purge_backups(0).unwrap() >= 1);
    assert_eq!(db.most_recent_backup().unwrap(), None);
}

#[test]
fn test_manager_from_config() {
    let dir = TempDir::new().unwrap();
    let config = KeeperConfig {
        data_dir: dir.path().to_string_lossy().to_string(),
        database_file: "app.db".to_string(),
        tables: vec![TableConfig {
            name: "events".to_string(),
            statement: "CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT NOT NULL)"
                .to_string(),
        }],
        ..KeeperConfig::default()
    };

    let db = DatabaseManager::from_config(&config).unwrap();
    db.create_database().unwrap();
    assert!(dir.path().join("app.db").exists());

    db.reconcile_tables().unwrap();
    let id = db
        .executor()
        .insert("events", &["kind"], params!["started"])
        .unwrap();
    assert_eq!(id, 1);

    let name = db.backup(Some("after-start")).unwrap().unwrap();
    assert_eq!(name, "after-start.db");
    assert!(dir.path().join("backups").join("after-start.db").exists());
}
