use serde::Serialize;
use sqlkeeper::{KeeperConfig, OutputFormat, TableConfig};

use super::print_json;

#[derive(Debug, Serialize)]
struct ConfigInfo<'a> {
    config_file: String,
    data_dir: &'a str,
    database_path: String,
    backup_dir: String,
    max_attempts: u32,
    busy_timeout_ms: u64,
    backup_retention_days: u32,
    tables: &'a [TableConfig],
}

pub fn run(config: &KeeperConfig, output_format: OutputFormat) {
    let info = ConfigInfo {
        config_file: KeeperConfig::config_file_path(),
        data_dir: &config.data_dir,
        database_path: config.database_path().to_string_lossy().to_string(),
        backup_dir: config.backup_dir().to_string_lossy().to_string(),
        max_attempts: config.max_attempts,
        busy_timeout_ms: config.busy_timeout_ms,
        backup_retention_days: config.backup_retention_days,
        tables: &config.tables,
    };

    if print_json(&info, output_format) {
        return;
    }

    println!("sqlkeeper Configuration");
    println!("=======================\n");
    println!("{}", config.summary());

    if !config.tables.is_empty() {
        println!();
        println!("Table Statements:");
        for table in &config.tables {
            println!("  {:<18}{}", table.name, table.statement);
        }
    }
}
