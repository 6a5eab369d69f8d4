//! Shoply CLI - database migrations, seeding and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! shoply-cli migrate
//!
//! # Load categories, products, banners and feature icons from YAML
//! shoply-cli seed --file catalog.yaml
//!
//! # Renumber every category sibling group to 0, 10, 20, ...
//! shoply-cli categories normalize
//! ```
//!
//! All commands read `SHOP_DATABASE_URL` (or `DATABASE_URL`), also from `.env`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shoply-cli")]
#[command(author, version, about = "Shoply CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Category maintenance
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Subcommand)]
enum CategoryAction {
    /// Renumber sibling order values evenly
    Normalize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Categories { action } => match action {
            CategoryAction::Normalize => commands::categories::normalize().await?,
        },
    }
    Ok(())
}
