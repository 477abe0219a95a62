//! `NexGen` CLI - session store migrations and backend tooling.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table in the storefront database
//! nexgen-cli migrate
//!
//! # Download the backend's OpenAPI document
//! nexgen-cli openapi fetch --url http://127.0.0.1:8000 --out openapi.json
//!
//! # Check the backend answers and serves a catalogue
//! nexgen-cli backend check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the `tower_sessions` table
//! - `openapi fetch` - Save `/api/openapi.json` to a file
//! - `backend check` - List products and report what came back

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nexgen-cli")]
#[command(author, version, about = "NexGen storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session store table
    Migrate,
    /// Work with the backend's OpenAPI document
    Openapi {
        #[command(subcommand)]
        action: OpenapiAction,
    },
    /// Talk to the backend API
    Backend {
        #[command(subcommand)]
        action: BackendAction,
    },
}

#[derive(Subcommand)]
enum OpenapiAction {
    /// Download the OpenAPI document to a file
    Fetch {
        /// Backend base URL (default: `BACKEND_API_URL` or <http://127.0.0.1:8000>)
        #[arg(short, long)]
        url: Option<String>,

        /// Output file
        #[arg(short, long, default_value = "openapi.json")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum BackendAction {
    /// List products and report the count per category
    Check {
        /// Backend base URL (default: `BACKEND_API_URL` or <http://127.0.0.1:8000>)
        #[arg(short, long)]
        url: Option<String>,
    },
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
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Openapi { action } => match action {
            OpenapiAction::Fetch { url, out } => {
                commands::openapi::fetch(url.as_deref(), &out).await?;
            }
        },
        Commands::Backend { action } => match action {
            BackendAction::Check { url } => commands::backend::check(url.as_deref()).await?,
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
    fn test_openapi_fetch_defaults() {
        let cli = Cli::try_parse_from(["nexgen-cli", "openapi", "fetch"]);
        let Ok(Cli {
            command: Commands::Openapi {
                action: OpenapiAction::Fetch { url, out },
            },
        }) = cli
        else {
            panic!("expected openapi fetch");
        };
        assert_eq!(url, None);
        assert_eq!(out, PathBuf::from("openapi.json"));
    }
}
