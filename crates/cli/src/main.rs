//! NightOwl CLI - Database migrations and store management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! nightowl migrate
//!
//! # Validate the store settings file
//! nightowl check-config crates/storefront/config/store.yaml
//!
//! # Is the store open now, or at a given local time?
//! nightowl status --at "2026-10-16 23:30"
//!
//! # Load products from a YAML file
//! nightowl seed crates/cli/seed/products.yaml
//!
//! # Orders stuck awaiting payment for more than an hour
//! nightowl pending --older-than 60
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nightowl")]
#[command(author, version, about = "NightOwl CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Validate a store settings file
    CheckConfig {
        /// Settings file (default: `STOREFRONT_STORE_CONFIG` or the bundled store.yaml)
        path: Option<PathBuf>,
    },
    /// Show whether the store is open
    Status {
        /// Local time to check instead of now, as "YYYY-MM-DD HH:MM"
        #[arg(long, value_parser = parse_local_time)]
        at: Option<NaiveDateTime>,

        /// Settings file (default: `STOREFRONT_STORE_CONFIG` or the bundled store.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Insert or update catalog products from a YAML file
    Seed {
        /// YAML file with a `products` list
        path: PathBuf,
    },
    /// List orders still awaiting payment
    Pending {
        /// Only orders placed more than this many minutes ago
        #[arg(long, default_value_t = 30)]
        older_than: u32,
    },
}

fn parse_local_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM\": {e}"))
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::CheckConfig { path } => commands::store::check_config(path)?,
        Commands::Status { at, config } => commands::store::status(config, at)?,
        Commands::Seed { path } => commands::seed::products(&path).await?,
        Commands::Pending { older_than } => commands::orders::pending(older_than).await?,
    }
    Ok(())
}
