use serde::Serialize;
use sqlkeeper::{format_size, DatabaseManager, KeeperConfig, OutputFormat};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::{open_manager, print_json};

#[derive(Debug, Serialize)]
struct DatabaseStatus {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    live_tables: Vec<String>,
    declared_tables: Vec<TableStatus>,
    tables_verified: bool,
    backup_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct TableStatus {
    #[tabled(rename = "Table")]
    name: String,
    #[tabled(rename = "Present")]
    present: bool,
}

pub fn run(config: &KeeperConfig, output_format: OutputFormat) {
    let db = open_manager(config);
    let status = collect_status(&db);

    if print_json(&status, output_format) {
        return;
    }
    print_status_table(&status);
}

fn collect_status(db: &DatabaseManager) -> DatabaseStatus {
    let exists = db.database_exists();
    let size_bytes = if exists {
        std::fs::metadata(db.path()).ok().map(|m| m.len())
    } else {
        None
    };

    let (backup_count, latest_backup) = match db.backups().list() {
        Ok(backups) => (backups.len(), backups.first().map(|b| b.name.clone())),
        Err(_) => (0, None),
    };

    let mut status = DatabaseStatus {
        path: db.path().to_string_lossy().to_string(),
        exists,
        size_bytes,
        live_tables: Vec::new(),
        declared_tables: Vec::new(),
        tables_verified: false,
        backup_count,
        latest_backup,
        error: None,
    };

    // opening would create an empty file; status must not change anything
    if !exists {
        status.declared_tables = db
            .registry()
            .tables()
            .iter()
            .map(|spec| TableStatus {
                name: spec.name.clone(),
                present: false,
            })
            .collect();
        return status;
    }

    match (db.live_tables(), db.missing_tables()) {
        (Ok(live), Ok(missing)) => {
            status.declared_tables = db
                .registry()
                .tables()
                .iter()
                .map(|spec| TableStatus {
                    name: spec.name.clone(),
                    present: !missing.contains(&spec.name),
                })
                .collect();
            status.tables_verified = missing.is_empty();
            status.live_tables = live;
        }
        (Err(e), _) | (_, Err(e)) => status.error = Some(e.to_string()),
    }

    db.close();
    status
}

fn print_status_table(status: &DatabaseStatus) {
    println!("sqlkeeper Database Status");
    println!("=========================\n");

    println!("Database:");
    println!("  Path:           {}", status.path);
    println!(
        "  Status:         {}",
        if status.exists { "exists" } else { "not created" }
    );
    if let Some(size) = status.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    if let Some(ref error) = status.error {
        println!("  Error:          {}", error);
    }
    if !status.live_tables.is_empty() {
        println!("  Live Tables:    {}", status.live_tables.join(", "));
    }

    println!();
    if status.declared_tables.is_empty() {
        println!("Declared Tables: (none)");
    } else {
        println!(
            "Declared Tables: {}",
            if status.tables_verified {
                "all present"
            } else {
                "missing tables, run `sqlkeeper init`"
            }
        );
        println!(
            "{}",
            Table::new(&status.declared_tables).with(Style::rounded())
        );
    }

    println!();
    match &status.latest_backup {
        Some(latest) => println!("Backups: {} (latest: {})", status.backup_count, latest),
        None => println!("Backups: none"),
    }
}
