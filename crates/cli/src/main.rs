//! Larder CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! larder-cli migrate
//!
//! # Delete stale pending invitations
//! larder-cli invitations prune
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `invitations prune` - Delete pending invitations past their expiry

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "larder-cli")]
#[command(author, version, about = "Larder CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Invitation maintenance
    Invitations {
        #[command(subcommand)]
        action: InvitationAction,
    },
}

#[derive(Subcommand)]
enum InvitationAction {
    /// Delete pending invitations past their expiry
    Prune {
        /// Keep invitations that expired less than this many days ago
        #[arg(long, default_value_t = 0)]
        grace_days: u32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Invitations { action } => match action {
            InvitationAction::Prune { grace_days } => {
                commands::invitations::prune(grace_days).await?;
            }
        },
    }
    Ok(())
}
