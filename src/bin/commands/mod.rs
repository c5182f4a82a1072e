pub mod backup;
pub mod config;
pub mod init;
pub mod status;

use serde::Serialize;
use sqlkeeper::{DatabaseManager, KeeperConfig, OutputFormat};

/// Print `value` as JSON when the format asks for it; returns false for table output
pub(crate) fn print_json<T: Serialize>(value: &T, output_format: OutputFormat) -> bool {
    match output_format.render_json(value) {
        Some(Ok(json)) => {
            println!("{}", json);
            true
        }
        Some(Err(e)) => {
            eprintln!("Error serializing output: {}", e);
            true
        }
        None => false,
    }
}

/// Open the configured database, exiting with an error message on failure
pub(crate) fn open_manager(config: &KeeperConfig) -> DatabaseManager {
    match DatabaseManager::from_config(config) {
        Ok(db) => db,
        Err(e) => exit_with(e),
    }
}

pub(crate) fn exit_with(e: sqlkeeper::Error) -> ! {
    eprintln!("ERROR: {}", e.user_message());
    std::process::exit(1);
}
