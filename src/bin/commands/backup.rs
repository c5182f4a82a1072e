use clap::{Args, Subcommand};
use sqlkeeper::{BackupRow, DatabaseManager, KeeperConfig, OutputFormat};
use tabled::settings::Style;
use tabled::Table;

use super::{exit_with, open_manager, print_json};

/// Arguments for the Backup command
#[derive(Args)]
pub struct BackupArgs {
    #[clap(subcommand)]
    pub command: BackupCommands,
}

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Copy the database file into the backup directory
    Create {
        /// Backup file name, defaults to the current Unix timestamp
        #[clap(value_name = "NAME")]
        name: Option<String>,
    },

    /// Replace the database file with a backup (the current file is backed up first)
    Restore {
        /// Backup file name as shown by `backup list`
        #[clap(value_name = "NAME")]
        name: String,
    },

    /// Delete backups at least N days old
    Purge {
        /// Age limit in days, defaults to `backup_retention_days` from the configuration
        #[clap(long)]
        days: Option<u32>,
    },

    /// Show the most recent backup
    Latest,

    /// List all backups, newest first
    List,
}

pub fn run(config: &KeeperConfig, args: BackupArgs, output_format: OutputFormat) {
    let db = open_manager(config);

    match args.command {
        BackupCommands::Create { name } => run_create(&db, name.as_deref(), output_format),
        BackupCommands::Restore { name } => run_restore(&db, &name, output_format),
        BackupCommands::Purge { days } => run_purge(
            &db,
            days.unwrap_or(config.backup_retention_days),
            output_format,
        ),
        BackupCommands::Latest => run_latest(&db, output_format),
        BackupCommands::List => run_list(&db, output_format),
    }
}

fn run_create(db: &DatabaseManager, name: Option<&str>, output_format: OutputFormat) {
    let backup = match db.backup(name) {
        Ok(backup) => backup,
        Err(e) => exit_with(e),
    };

    let result = serde_json::json!({
        "success": backup.is_some(),
        "backup": backup,
        "directory": db.backups().backup_dir(),
    });
    if print_json(&result, output_format) {
        return;
    }

    match backup {
        Some(name) => println!(
            "Backup created: {}",
            db.backups().backup_dir().join(name).display()
        ),
        None => {
            eprintln!(
                "Database file {} does not exist, nothing to back up",
                db.path().display()
            );
            std::process::exit(1);
        }
    }
}

fn run_restore(db: &DatabaseManager, name: &str, output_format: OutputFormat) {
    if let Err(e) = db.restore_backup(name) {
        exit_with(e);
    }

    let result = serde_json::json!({
        "success": true,
        "restored": name,
        "path": db.path(),
    });
    if !print_json(&result, output_format) {
        println!("Restored {} from backup {}", db.path().display(), name);
    }
}

fn run_purge(db: &DatabaseManager, days: u32, output_format: OutputFormat) {
    let deleted = match db.purge_backups(days) {
        Ok(deleted) => deleted,
        Err(e) => exit_with(e),
    };

    let result = serde_json::json!({
        "deleted": deleted,
        "days": days,
    });
    if !print_json(&result, output_format) {
        println!("Deleted {} backup(s) at least {} day(s) old", deleted, days);
    }
}

fn run_latest(db: &DatabaseManager, output_format: OutputFormat) {
    let latest = match db.most_recent_backup() {
        Ok(latest) => latest,
        Err(e) => exit_with(e),
    };

    if print_json(&serde_json::json!({ "latest": latest }), output_format) {
        return;
    }
    match latest {
        Some(name) => println!("{}", name),
        None => println!("No backups found in {}", db.backups().backup_dir().display()),
    }
}

fn run_list(db: &DatabaseManager, output_format: OutputFormat) {
    let backups = match db.backups().list() {
        Ok(backups) => backups,
        Err(e) => exit_with(e.into()),
    };

    if print_json(&backups, output_format) {
        return;
    }
    if backups.is_empty() {
        println!("No backups found in {}", db.backups().backup_dir().display());
        return;
    }

    let rows: Vec<BackupRow> = backups.iter().map(BackupRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}
