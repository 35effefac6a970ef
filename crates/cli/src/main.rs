//! Snippetbox CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run schema and session-table migrations
//! snippetbox-cli migrate
//!
//! # Create the first administrator (password read from stdin)
//! echo 'long secret' | snippetbox-cli admin create -e root@example.com -n "Root"
//!
//! # Delete expired sessions of both scopes
//! snippetbox-cli sessions prune
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create an administrator account
//! - `sessions prune` - Delete expired sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "snippetbox-cli")]
#[command(author, version, about = "Snippetbox CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Maintain the session tables
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new administrator account
    Create {
        /// Administrator email address
        #[arg(short, long)]
        email: String,

        /// Administrator display name
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// Delete expired user and admin sessions
    Prune,
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name } => {
                commands::admin::create(&email, &name).await?;
            }
        },
        Commands::Sessions { action } => match action {
            SessionsAction::Prune => commands::sessions::prune().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_admin_create_requires_email_and_name() {
        assert!(Cli::try_parse_from(["snippetbox-cli", "admin", "create", "-n", "Root"]).is_err());
        assert!(
            Cli::try_parse_from([
                "snippetbox-cli",
                "admin",
                "create",
                "-e",
                "root@example.com",
                "-n",
                "Root"
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_sessions_prune_parses() {
        let cli = Cli::try_parse_from(["snippetbox-cli", "sessions", "prune"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sessions {
                action: SessionsAction::Prune
            }
        ));
        assert!(Cli::try_parse_from(["snippetbox-cli", "sessions"]).is_err());
    }
}
