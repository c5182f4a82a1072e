use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::database::{ConnectionSettings, SchemaRegistry, BACKUP_DIR_NAME};
use crate::error::RegistryError;

/// Default database file name inside the data directory
pub const DEFAULT_DATABASE_FILE: &str = "database.sqlite";

/// A table declared in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    /// Full `CREATE TABLE` statement or the part after `CREATE TABLE `
    pub statement: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeeperConfig {
    /// Directory holding the database file and its `backups/` directory
    pub data_dir: String,

    /// Database file name within `data_dir`
    pub database_file: String,

    /// Upper bound on attempts for any operation, retries included (default: 3)
    pub max_attempts: u32,

    /// How long SQLite waits on a locked database, in milliseconds (default: 5000)
    pub busy_timeout_ms: u64,

    /// Backups at least this many days old are purged (default: 30)
    pub backup_retention_days: u32,

    /// Tables the database is expected to contain
    pub tables: Vec<TableConfig>,
}

/// Values as read from file and environment; anything missing falls back to defaults
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    data_dir: Option<String>,
    database_file: Option<String>,
    max_attempts: Option<u32>,
    busy_timeout_ms: Option<u64>,
    backup_retention_days: Option<u32>,
    #[serde(default)]
    tables: Vec<TableConfig>,
}

const EMPTY_CONFIG: &str = r#"### sqlkeeper configuration file

### directory holding the database file and its backups
# data_dir = "~/.sqlkeeper"

### database file name inside data_dir
# database_file = "database.sqlite"

### connection settings
# max_attempts = 3            # attempts per operation, retries included
# busy_timeout_ms = 5000      # wait on a locked database

### backups older than this many days are purged
# backup_retention_days = 30

### tables the database should contain
# [[tables]]
# name = "users"
# statement = "users (id INTEGER PRIMARY KEY, name TEXT)"
"#;

impl Default for KeeperConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.sqlkeeper", home_dir),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            max_attempts: 3,
            busy_timeout_ms: 5000,
            backup_retention_days: 30,
            tables: Vec::new(),
        }
    }
}

impl KeeperConfig {
    /// Load configuration from `path`, or from `~/.sqlkeeper/sqlkeeper.toml`
    ///
    /// A missing file is created with a commented template. `SQLKEEPER_*` environment
    /// variables override file values.
    pub fn new(path: &Option<String>) -> Result<KeeperConfig> {
        let mut builder = Config::builder();

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    builder = builder.add_source(config::File::from(path));
                } else {
                    std::fs::write(path, EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                let home =
                    dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
                let keeper_dir = home.join(".sqlkeeper");
                std::fs::create_dir_all(&keeper_dir)
                    .map_err(|e| anyhow!("Unable to create sqlkeeper directory: {}", e))?;
                let p = keeper_dir.join("sqlkeeper.toml");
                if p.exists() {
                    builder = builder.add_source(config::File::from(p));
                } else {
                    std::fs::write(&p, EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file {:?}: {}", p, e))?;
                }
            }
        }

        // E.g., `SQLKEEPER_DATA_DIR=/srv/app sqlkeeper status` moves the data directory
        builder = builder
            .add_source(config::Environment::with_prefix("SQLKEEPER").try_parsing(true));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let raw = settings
            .try_deserialize::<RawConfig>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<KeeperConfig> {
        let defaults = KeeperConfig::default();

        let data_dir = match raw.data_dir {
            Some(dir) => expand_home(&dir)?,
            None => defaults.data_dir,
        };

        let database_file = raw.database_file.unwrap_or(defaults.database_file);
        if database_file.trim().is_empty() || database_file.contains(['/', '\\']) {
            return Err(anyhow!(
                "database_file must be a plain file name, got '{}'",
                database_file
            ));
        }

        let max_attempts = raw.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }

        Ok(KeeperConfig {
            data_dir,
            database_file,
            max_attempts,
            busy_timeout_ms: raw.busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
            backup_retention_days: raw
                .backup_retention_days
                .unwrap_or(defaults.backup_retention_days),
            tables: raw.tables,
        })
    }

    /// Get the path to the database file
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.database_file)
    }

    /// Get the backup directory path
    pub fn backup_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join(BACKUP_DIR_NAME)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            max_attempts: self.max_attempts,
            busy_timeout: self.busy_timeout(),
            ..ConnectionSettings::default()
        }
    }

    /// Registry holding the configured tables, in file order
    pub fn schema_registry(&self) -> std::result::Result<SchemaRegistry, RegistryError> {
        let mut registry = SchemaRegistry::new();
        for table in &self.tables {
            registry.register(&table.name, &table.statement)?;
        }
        Ok(registry)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Config File:        {}", Self::config_file_path()),
            format!("Data Directory:     {}", self.data_dir),
            format!("Database Path:      {}", self.database_path().display()),
            format!("Backup Directory:   {}", self.backup_dir().display()),
            format!("Max Attempts:       {}", self.max_attempts),
            format!("Busy Timeout:       {} ms", self.busy_timeout_ms),
            format!("Backup Retention:   {} days", self.backup_retention_days),
        ];

        if self.tables.is_empty() {
            lines.push("Declared Tables:    (none)".to_string());
        } else {
            let names: Vec<&str> = self.tables.iter().map(|t| t.name.as_str()).collect();
            lines.push(format!("Declared Tables:    {}", names.join(", ")));
        }

        lines.join("\n")
    }

    /// Get the default config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.sqlkeeper/sqlkeeper.toml", home_dir)
    }
}

fn expand_home(dir: &str) -> Result<String> {
    match dir.strip_prefix("~/").or(if dir == "~" { Some("") } else { None }) {
        Some(rest) => {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
            Ok(home.join(rest).to_string_lossy().to_string())
        }
        None => Ok(dir.to_string()),
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = KeeperConfig::default();
        assert_eq!(config.database_file, "database.sqlite");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.backup_retention_days, 30);
        assert!(config.data_dir.ends_with(".sqlkeeper"));
    }

    #[test]
    fn test_paths() {
        let config = KeeperConfig {
            data_dir: "/test/dir".to_string(),
            ..KeeperConfig::default()
        };

        assert_eq!(
            config.database_path(),
            PathBuf::from("/test/dir/database.sqlite")
        );
        assert_eq!(config.backup_dir(), PathBuf::from("/test/dir/backups"));
    }

    #[test]
    fn test_connection_settings() {
        let config = KeeperConfig {
            max_attempts: 5,
            busy_timeout_ms: 250,
            ..KeeperConfig::default()
        };
        let settings = config.connection_settings();
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.busy_timeout, Duration::from_millis(250));
        assert!(settings.foreign_keys);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sqlkeeper.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/srv/app"
database_file = "app.db"
max_attempts = 4
backup_retention_days = 7

[[tables]]
name = "users"
statement = "users (id INTEGER PRIMARY KEY, name TEXT)"

[[tables]]
name = "notes"
statement = "CREATE TABLE notes (body TEXT)"
"#,
        )
        .unwrap();

        let config = KeeperConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.data_dir, "/srv/app");
        assert_eq!(config.database_path(), PathBuf::from("/srv/app/app.db"));
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.backup_retention_days, 7);

        let registry = config.schema_registry().unwrap();
        let names: Vec<&str> = registry.tables().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "notes"]);
    }

    #[test]
    fn test_missing_file_gets_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.toml");

        let config = KeeperConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(config.database_file, DEFAULT_DATABASE_FILE);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("### sqlkeeper configuration file"));

        // the template itself parses to the defaults
        let reloaded = KeeperConfig::new(&Some(path.to_string_lossy().to_string())).unwrap();
        assert_eq!(reloaded.max_attempts, 3);
        assert!(reloaded.tables.is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let raw = RawConfig {
            max_attempts: Some(0),
            ..RawConfig::default()
        };
        assert!(KeeperConfig::from_raw(raw).is_err());

        let raw = RawConfig {
            database_file: Some("../escape.sqlite".to_string()),
            ..RawConfig::default()
        };
        assert!(KeeperConfig::from_raw(raw).is_err());
    }

    #[test]
    fn test_duplicate_tables_in_config() {
        let table = TableConfig {
            name: "users".to_string(),
            statement: "users (id INTEGER)".to_string(),
        };
        let config = KeeperConfig {
            tables: vec![table.clone(), table],
            ..KeeperConfig::default()
        };
        assert!(matches!(
            config.schema_registry(),
            Err(RegistryError::DuplicateTable(_))
        ));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            expand_home("~/data").unwrap(),
            home.join("data").to_string_lossy()
        );
        assert_eq!(expand_home("/abs/path").unwrap(), "/abs/path");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_summary_lists_tables() {
        let config = KeeperConfig {
            data_dir: "/test".to_string(),
            tables: vec![TableConfig {
                name: "users".to_string(),
                statement: "users (id INTEGER)".to_string(),
            }],
            ..KeeperConfig::default()
        };
        let summary = config.summary();
        assert!(summary.contains("/test/database.sqlite"));
        assert!(summary.contains("Declared Tables:    users"));
    }
}
