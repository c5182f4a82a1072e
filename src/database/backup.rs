//! File-level backups of the database file
//!
//! Backups are plain copies of the database file stored flat in a `backups/` directory
//! next to it. There is no catalog: the directory listing is the source of truth, and
//! ordering comes from each file's creation time (modification time on filesystems
//! that do not record creation).
//!
//! # File Naming
//!
//! Default names are the current UTC Unix timestamp in seconds plus the database
//! file's extension, e.g. `1700000000.sqlite`. Two default backups taken within the
//! same second share a name and the later one overwrites the earlier.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::format_size;
use crate::error::BackupError;

/// Directory name for backups, relative to the database file's directory
pub const BACKUP_DIR_NAME: &str = "backups";

const STAGING_EXTENSION: &str = "partial";

/// A backup file found in the backup directory
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// File name, as accepted by [`BackupManager::restore`]
    pub name: String,
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Creation time, or modification time when creation is not recorded
    pub created: DateTime<Utc>,
}

/// One backup formatted for display
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
pub struct BackupRow {
    #[cfg_attr(feature = "display", tabled(rename = "Name"))]
    pub name: String,
    #[cfg_attr(feature = "display", tabled(rename = "Size"))]
    pub size: String,
    #[cfg_attr(feature = "display", tabled(rename = "Created"))]
    pub created: String,
}

impl From<&BackupInfo> for BackupRow {
    fn from(info: &BackupInfo) -> Self {
        BackupRow {
            name: info.name.clone(),
            size: format_size(info.size),
            created: info.created.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Snapshot, restore and retention over one database file
#[derive(Debug, Clone)]
pub struct BackupManager {
    database_path: PathBuf,
    backup_dir: PathBuf,
}

impl BackupManager {
    /// Manage backups of `database_path` in `<its directory>/backups`
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let database_path = database_path.into();
        let backup_dir = database_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(BACKUP_DIR_NAME);
        Self {
            database_path,
            backup_dir,
        }
    }

    /// Manage backups of `database_path` in an explicit directory
    pub fn with_backup_dir(
        database_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            database_path: database_path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Extension shared by the database file and its backups
    pub fn extension(&self) -> Option<&str> {
        self.database_path.extension().and_then(|e| e.to_str())
    }

    /// Copy the live database file into the backup directory
    ///
    /// Without a name the current Unix timestamp is used. A name lacking the database
    /// extension gets it appended. An existing backup with the same name is replaced.
    ///
    /// Returns the backup's file name, or `None` when there is no database file to copy.
    pub fn backup(&self, name: Option<&str>) -> Result<Option<String>, BackupError> {
        let name = match name {
            Some(name) => self.file_name_for(name)?,
            None => self.default_name(),
        };

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| BackupError::io(&self.backup_dir, e))?;

        if !self.database_path.is_file() {
            warn!(
                "Database file {:?} does not exist, nothing to back up",
                self.database_path
            );
            return Ok(None);
        }

        // copy under a staging name, then move into place so the backup gets a fresh
        // creation time even when it replaces an older file
        let target = self.backup_dir.join(&name);
        let staging = target.with_extension(STAGING_EXTENSION);
        if let Err(e) = fs::copy(&self.database_path, &staging) {
            discard_staging(&staging);
            return Err(BackupError::io(&staging, e));
        }
        if let Err(e) = fs::rename(&staging, &target) {
            discard_staging(&staging);
            return Err(BackupError::io(&target, e));
        }

        info!("Backed up {:?} to {:?}", self.database_path, target);
        Ok(Some(name))
    }

    /// Replace the live database file with the named backup
    ///
    /// A default-named backup of the current file is taken first. The caller must make
    /// sure no connection is open on the database.
    pub fn restore(&self, name: &str) -> Result<(), BackupError> {
        let source = self.backup_path(name)?;
        if !source.is_file() {
            return Err(BackupError::NotFound(name.to_string()));
        }

        // stage the chosen backup first: the safety backup may reuse its name
        let staging = self.database_path.with_extension(STAGING_EXTENSION);
        if let Some(parent) = staging.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| BackupError::io(parent, e))?;
        }
        if let Err(e) = fs::copy(&source, &staging) {
            discard_staging(&staging);
            return Err(BackupError::io(&staging, e));
        }

        let safety = match self.backup(None) {
            Ok(safety) => safety,
            Err(e) => {
                discard_staging(&staging);
                return Err(e);
            }
        };
        if let Some(safety) = safety {
            info!("Saved current database as {} before restoring", safety);
        }

        if let Err(e) = fs::rename(&staging, &self.database_path) {
            discard_staging(&staging);
            return Err(BackupError::io(&self.database_path, e));
        }

        info!("Restored {:?} from {}", self.database_path, name);
        Ok(())
    }

    /// Delete backups that are at least `day_limit` days old
    ///
    /// `purge(0)` removes every backup. Returns the number of files deleted.
    pub fn purge(&self, day_limit: u32) -> Result<usize, BackupError> {
        let now = Utc::now();
        let mut deleted = 0;

        for backup in self.list()? {
            let age = now.signed_duration_since(backup.created);
            if age.num_days() < i64::from(day_limit) {
                continue;
            }
            fs::remove_file(&backup.path).map_err(|e| BackupError::io(&backup.path, e))?;
            debug!("Deleted backup {} ({} days old)", backup.name, age.num_days());
            deleted += 1;
        }

        info!(
            "Purged {} backup(s) older than {} day(s) from {:?}",
            deleted, day_limit, self.backup_dir
        );
        Ok(deleted)
    }

    /// Name of the newest backup, if any
    pub fn most_recent(&self) -> Result<Option<String>, BackupError> {
        Ok(self.list()?.into_iter().next().map(|backup| backup.name))
    }

    /// All backups, newest first
    ///
    /// Only regular files directly inside the backup directory that carry the database
    /// extension count as backups. A missing directory has no backups.
    pub fn list(&self) -> Result<Vec<BackupInfo>, BackupError> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io(&self.backup_dir, e)),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BackupError::io(&self.backup_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != self.extension() {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| BackupError::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }

            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            backups.push(BackupInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
                size: metadata.len(),
                created: DateTime::<Utc>::from(created),
            });
        }

        backups.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// Path of a backup by name, after checking the name is a plain file name
    pub fn backup_path(&self, name: &str) -> Result<PathBuf, BackupError> {
        validate_name(name)?;
        Ok(self.backup_dir.join(name))
    }

    fn default_name(&self) -> String {
        let stamp = Utc::now().timestamp();
        match self.extension() {
            Some(ext) => format!("{}.{}", stamp, ext),
            None => stamp.to_string(),
        }
    }

    fn file_name_for(&self, name: &str) -> Result<String, BackupError> {
        validate_name(name)?;
        match self.extension() {
            Some(ext) if Path::new(name).extension().and_then(|e| e.to_str()) != Some(ext) => {
                Ok(format!("{}.{}", name, ext))
            }
            _ => Ok(name.to_string()),
        }
    }
}

fn discard_staging(staging: &Path) {
    if let Err(e) = fs::remove_file(staging) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Unable to remove staging file {:?}: {}", staging, e);
        }
    }
}

fn validate_name(name: &str) -> Result<(), BackupError> {
    let plain = !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if plain {
        Ok(())
    } else {
        Err(BackupError::InvalidName(name.to_string()))
    }
}
