//! Bon Manual CLI - talk to the manual backend from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Check a store code
//! bm-cli --password 1234 verify --role user
//!
//! # Ask one question, streaming the answer
//! BM_PASSWORD=1234 bm-cli ask "When do I reorder napkins?"
//!
//! # Interactive chat against another backend
//! bm-cli --backend https://manual.example.com --password 1234 chat
//!
//! # Administrator views
//! bm-cli --password admin-secret categories
//! bm-cli --password admin-secret articles --category 2 --json
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_API_URL` - Manual backend base URL
//! - `BM_PASSWORD` - Role secret, used when `--password` is absent

#![cfg_attr(not(test), forbid(unsafe_code))]

use bon_manual_core::{CategoryId, Role};
use bon_manual_web::config::DEFAULT_BACKEND_URL;
use clap::{Parser, Subcommand};

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "bm-cli")]
#[command(author, version, about = "Bon operations-manual chatbot CLI")]
struct Cli {
    /// Manual backend base URL
    #[arg(long, global = true, env = "BACKEND_API_URL", default_value = DEFAULT_BACKEND_URL)]
    backend: String,

    /// Role secret (store code or administrator password)
    #[arg(long, global = true, env = "BM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively as a store owner
    Chat,
    /// Ask one question as a store owner
    Ask {
        /// The question
        question: String,
    },
    /// Check a role secret
    Verify {
        /// Role to verify (`user` or `admin`)
        #[arg(short, long, default_value = "user")]
        role: Role,
    },
    /// Ask as an administrator and show retrieval details
    Preview {
        /// The question
        question: String,
    },
    /// List categories
    Categories,
    /// List articles
    Articles {
        /// Only articles in this category
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env if present (ignore errors)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so answers on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bm_cli=warn,bon_manual_web=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let context = Context::new(&cli.backend, cli.password, cli.json)?;

    match cli.command {
        Commands::Chat => commands::chat::interactive(&context).await,
        Commands::Ask { question } => commands::chat::ask(&context, &question).await,
        Commands::Verify { role } => commands::verify::run(&context, role).await,
        Commands::Preview { question } => commands::content::preview(&context, &question).await,
        Commands::Categories => commands::content::categories(&context).await,
        Commands::Articles { category } => commands::content::articles(&context, category).await,
    }
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
    fn test_parse_articles_with_category() {
        let cli = Cli::try_parse_from(["bm-cli", "--password", "x", "articles", "--category", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Articles { category: Some(id) } if id == CategoryId::new(3)
        ));
        assert_eq!(cli.password.as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_verify_role() {
        let cli = Cli::try_parse_from(["bm-cli", "verify", "--role", "admin"]).unwrap();
        assert!(matches!(cli.command, Commands::Verify { role: Role::Admin }));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(Cli::try_parse_from(["bm-cli", "verify", "--role", "owner"]).is_err());
    }
}
