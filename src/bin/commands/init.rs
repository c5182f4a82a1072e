use serde::Serialize;
use sqlkeeper::{KeeperConfig, OutputFormat};

use super::{exit_with, open_manager, print_json};

#[derive(Debug, Serialize)]
struct InitResult {
    path: String,
    created_file: bool,
    created: Vec<String>,
    present: Vec<String>,
    failed: Vec<FailedTable>,
}

#[derive(Debug, Serialize)]
struct FailedTable {
    table: String,
    error: String,
}

pub fn run(config: &KeeperConfig, output_format: OutputFormat) {
    let db = open_manager(config);

    let created_file = !db.database_exists();
    if created_file {
        if let Err(e) = db.create_database() {
            exit_with(e);
        }
    }

    let report = match db.reconcile_tables() {
        Ok(report) => report,
        Err(e) => exit_with(e.into()),
    };
    db.close();

    let result = InitResult {
        path: db.path().to_string_lossy().to_string(),
        created_file,
        created: report.created,
        present: report.present,
        failed: report
            .failed
            .iter()
            .map(|f| FailedTable {
                table: f.table.clone(),
                error: f.source.to_string(),
            })
            .collect(),
    };

    if !print_json(&result, output_format) {
        if result.created_file {
            println!("Created database file {}", result.path);
        } else {
            println!("Using database file {}", result.path);
        }
        for name in &result.created {
            println!("  created   {}", name);
        }
        for name in &result.present {
            println!("  present   {}", name);
        }
        for failed in &result.failed {
            println!("  FAILED    {}: {}", failed.table, failed.error);
        }
        if result.created.is_empty() && result.present.is_empty() && result.failed.is_empty() {
            println!("No tables declared in configuration.");
        }
    }

    if !result.failed.is_empty() {
        std::process::exit(1);
    }
}
