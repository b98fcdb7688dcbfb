//! Manual catalog backup and restore
//!
//! ```sh
//! storefront-backup backup
//! storefront-backup restore products-backup-2024-01-15T10-30-45-123Z.json
//! ```
//!
//! The database must not be held open by a running server; the command
//! retries for a few seconds before giving up.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use storefront::backup::BackupJob;
use storefront::config::Config;

#[derive(Parser)]
#[command(name = "storefront-backup", about = "Back up or restore the product catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write all products to a new timestamped backup file
    Backup,
    /// Load a backup file into an empty catalog
    Restore {
        /// File name inside the backup directory
        file: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storefront=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    let job = BackupJob::new(&config.backup_dir, &config.database_path)
        .with_retention(config.backup_retention);

    let succeeded = match cli.command {
        Command::Backup => job.backup_products(None).await.is_ok(),
        Command::Restore { file } => job.restore_products(&file, None).await.is_ok(),
    };

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
