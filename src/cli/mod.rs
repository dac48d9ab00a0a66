pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::time_format::Locale;
use client::JournalClient;
use config::SessionConfig;

#[derive(Parser)]
#[command(name = "journal")]
#[command(about = "Journal CLI - Command-line client for the journal API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Server URL (defaults to the saved session's server)")]
    pub server: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Account and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Journal entries")]
    Entry {
        #[command(subcommand)]
        cmd: commands::entry::EntryCommands,
    },

    #[command(about = "Server information and health")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Per-invocation settings shared by every command
pub struct Context {
    pub output_format: OutputFormat,
    pub server: Option<String>,
    pub locale: Locale,
}

impl Context {
    /// Saved session plus a client pointed at the resolved server
    pub fn client(&self) -> anyhow::Result<(JournalClient, SessionConfig)> {
        let session = config::load_session()?;
        let server = session.resolve_server(self.server.as_deref());
        let client = JournalClient::new(&server, session.token.clone())?;
        Ok((client, session))
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context {
        output_format: OutputFormat::from_cli(&cli),
        server: cli.server,
        locale: crate::config::config().journal.locale,
    };

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx).await,
        Commands::Entry { cmd } => commands::entry::handle(cmd, &ctx).await,
        Commands::Server { cmd } => commands::server::handle(cmd, &ctx).await,
    }
}
