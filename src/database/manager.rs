//! One managed database file
//!
//! `DatabaseManager` bundles the connection, the declared schema and the backups of a
//! single database file. It is the usual entry point:
//!
//! ```rust,ignore
//! use sqlkeeper::database::{Clause, DatabaseManager};
//! use sqlkeeper::ConnectionSettings;
//!
//! let mut db = DatabaseManager::open("/var/lib/app/database.sqlite", ConnectionSettings::default(), true)?;
//! db.register_table("users", "users (id INTEGER PRIMARY KEY, name TEXT)")?;
//! db.reconcile_tables()?;
//!
//! let id = db.executor().insert("users", &["name"], rusqlite::params!["Alice"])?;
//! let rows = db.executor().select(&["name"], "users", &Clause::new("WHERE id = ?").bind(id))?;
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use super::backup::BackupManager;
use super::command::CommandExecutor;
use super::core::{
    list_live_tables, ConnectionController, ConnectionSettings, ReconcileReport, RetryPolicy,
    SchemaRegistry, TableSpec,
};
use crate::config::KeeperConfig;
use crate::error::{ConnectionError, ExecError, RegistryError, Result};

pub struct DatabaseManager {
    controller: ConnectionController,
    registry: SchemaRegistry,
    backups: BackupManager,
}

impl DatabaseManager {
    /// Manage the database at `path` without touching the filesystem
    ///
    /// The connection is opened lazily by the first operation that needs it.
    pub fn new(path: impl Into<PathBuf>, settings: ConnectionSettings) -> Self {
        let path = path.into();
        Self {
            backups: BackupManager::new(&path),
            controller: ConnectionController::new(path, settings),
            registry: SchemaRegistry::new(),
        }
    }

    /// Manage the database at `path`, creating the file first when `create_if_missing`
    /// is set and it does not exist yet
    pub fn open(
        path: impl Into<PathBuf>,
        settings: ConnectionSettings,
        create_if_missing: bool,
    ) -> Result<Self> {
        let manager = Self::new(path, settings);
        if create_if_missing && !manager.controller.database_exists() {
            manager.controller.create_database_file()?;
        }
        Ok(manager)
    }

    /// Build a manager from configuration, registering its declared tables
    ///
    /// Backups go to the configured backup directory.
    pub fn from_config(config: &KeeperConfig) -> Result<Self> {
        let path = config.database_path();
        let mut manager = Self::new(&path, config.connection_settings());
        manager.backups = BackupManager::with_backup_dir(path, config.backup_dir());
        manager.registry = config.schema_registry()?;
        Ok(manager)
    }

    /// Replace the retry policy used for opening and statements
    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.controller = self.controller.with_policy(policy);
        self
    }

    pub fn path(&self) -> &Path {
        self.controller.path()
    }

    pub fn controller(&self) -> &ConnectionController {
        &self.controller
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn executor(&self) -> CommandExecutor<'_> {
        CommandExecutor::new(&self.controller)
    }

    pub fn database_exists(&self) -> bool {
        self.controller.database_exists()
    }

    pub fn create_database(&self) -> Result<()> {
        Ok(self.controller.create_database_file()?)
    }

    pub fn ensure_open(&self) -> std::result::Result<(), ConnectionError> {
        self.controller.ensure_open()
    }

    pub fn close(&self) {
        self.controller.close();
    }

    pub fn register_table(
        &mut self,
        name: impl Into<String>,
        statement: impl Into<String>,
    ) -> std::result::Result<(), RegistryError> {
        self.registry.register(name, statement)
    }

    /// Create declared tables missing from the database
    pub fn reconcile_tables(&self) -> std::result::Result<ReconcileReport, ConnectionError> {
        self.registry.reconcile_all(&self.controller)
    }

    /// True when every declared table exists
    pub fn verify_tables(&self) -> std::result::Result<bool, ConnectionError> {
        self.registry.verify_all(&self.controller)
    }

    /// Every table in the database, declared or not
    pub fn live_tables(&self) -> std::result::Result<Vec<String>, ExecError> {
        list_live_tables(&self.controller)
    }

    pub fn missing_tables(&self) -> std::result::Result<Vec<String>, ExecError> {
        self.registry.missing_tables(&self.controller)
    }

    /// Create one table now, returning its failure instead of recording it
    pub fn create_table(&self, spec: &TableSpec) -> std::result::Result<(), ExecError> {
        self.executor().create_table(spec)
    }

    /// Copy the database file into the backup directory; see [`BackupManager::backup`]
    pub fn backup(&self, name: Option<&str>) -> Result<Option<String>> {
        Ok(self.backups.backup(name)?)
    }

    /// Close the connection and replace the database file with the named backup
    ///
    /// The next operation reopens the restored file.
    pub fn restore_backup(&self, name: &str) -> Result<()> {
        self.controller.close();
        self.backups.restore(name)?;
        info!("Database {:?} restored from backup {}", self.path(), name);
        Ok(())
    }

    pub fn purge_backups(&self, day_limit: u32) -> Result<usize> {
        Ok(self.backups.purge(day_limit)?)
    }

    pub fn most_recent_backup(&self) -> Result<Option<String>> {
        Ok(self.backups.most_recent()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Clause;
    use crate::error::Error;
    use rusqlite::params;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> DatabaseManager {
        let mut db = DatabaseManager::new(
            dir.path().join("database.sqlite"),
            ConnectionSettings::default(),
        );
        db.register_table("users", "users (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        db
    }

    #[test]
    fn test_open_creates_file_when_asked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("database.sqlite");

        let db = DatabaseManager::open(&path, ConnectionSettings::default(), false).unwrap();
        assert!(!db.database_exists());

        let db = DatabaseManager::open(&path, ConnectionSettings::default(), true).unwrap();
        assert!(db.database_exists());
        assert!(!db.controller().is_open());
    }

    #[test]
    fn test_duplicate_registration() {
        let dir = TempDir::new().unwrap();
        let mut db = manager_in(&dir);
        assert_eq!(
            db.register_table("users", "users (id INTEGER)"),
            Err(RegistryError::DuplicateTable("users".to_string()))
        );
        assert_eq!(db.registry().len(), 1);
    }

    #[test]
    fn test_reconcile_and_verify() {
        let dir = TempDir::new().unwrap();
        let db = manager_in(&dir);

        assert!(!db.verify_tables().unwrap());
        let report = db.reconcile_tables().unwrap();
        assert_eq!(report.created, vec!["users"]);
        assert!(db.verify_tables().unwrap());
        assert!(db.missing_tables().unwrap().is_empty());
        assert_eq!(db.live_tables().unwrap(), vec!["users"]);
    }

    #[test]
    fn test_restore_closes_and_reopens() {
        let dir = TempDir::new().unwrap();
        let db = manager_in(&dir);
        db.reconcile_tables().unwrap();
        db.executor()
            .insert("users", &["name"], params!["Alice"])
            .unwrap();

        let name = db.backup(Some("one-user")).unwrap().unwrap();
        db.executor()
            .insert("users", &["name"], params!["Bob"])
            .unwrap();
        assert!(db.controller().is_open());

        db.restore_backup(&name).unwrap();
        assert!(!db.controller().is_open());

        let names: Vec<String> = db
            .executor()
            .select(&["name"], "users", &Clause::empty())
            .unwrap()
            .map(|row| row.get::<String>(0).unwrap())
            .collect();
        assert_eq!(names, vec!["Alice"]);
        assert_eq!(db.controller().open_count(), 2);
    }

    #[test]
    fn test_restore_missing_backup() {
        let dir = TempDir::new().unwrap();
        let db = manager_in(&dir);
        let err = db.restore_backup("nope.sqlite").unwrap_err();
        assert!(matches!(err, Error::Backup(_)));
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let config = KeeperConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            tables: vec![crate::config::TableConfig {
                name: "notes".to_string(),
                statement: "notes (body TEXT)".to_string(),
            }],
            ..KeeperConfig::default()
        };

        let db = DatabaseManager::from_config(&config).unwrap();
        assert_eq!(db.path(), config.database_path());
        assert_eq!(db.backups().backup_dir(), config.backup_dir());
        assert!(db.registry().contains("notes"));
        assert_eq!(db.controller().settings().max_attempts, 3);
    }
}
