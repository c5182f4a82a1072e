use clap::{Parser, Subcommand};
use sqlkeeper::{KeeperConfig, OutputFormat};
use tracing::Level;

mod commands;

use commands::backup::BackupArgs;

/// Manage a single embedded SQLite database file: tables, status and backups
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Configuration file path, defaults to ~/.sqlkeeper/sqlkeeper.toml
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table (default), json, json-pretty
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config,

    /// Show database file, live tables and declared table verification
    Status,

    /// Create the database file if missing and create missing declared tables
    Init,

    /// Create, restore, purge and list backups of the database file
    Backup(BackupArgs),
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level TRACE or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match KeeperConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Config => commands::config::run(&config, cli.format),
        Commands::Status => commands::status::run(&config, cli.format),
        Commands::Init => commands::init::run(&config, cli.format),
        Commands::Backup(args) => commands::backup::run(&config, args, cli.format),
    }
}
