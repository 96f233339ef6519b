//! Warden CLI - evaluate and probe tenant-scoped authorization decisions.
//!
//! Provides offline decision checks, tenant scoping, server probes, and configuration management.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check, config, health, probe, scope};
use output::OutputFormat;

/// Exit status when a request is denied.
const DENIED_EXIT_CODE: i32 = 2;

/// Warden - tenant-scoped request authorization
#[derive(Parser)]
#[command(
    name = "warden",
    version,
    about = "Warden - tenant-scoped request authorization",
    long_about = "CLI tool for evaluating authorization decisions offline, probing a running Warden server, and managing CLI defaults.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Server URL
    #[arg(long, global = true, env = "WARDEN_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a decision locally (exit 2 on deny)
    Check(check::CheckArgs),

    /// Show how a path is scoped to a tenant (exit 2 on failure)
    Scope(scope::ScopeArgs),

    /// Send a request to a running server with identity headers (exit 2 on 403)
    Probe(probe::ProbeArgs),

    /// Check server health
    Health,

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| config::load_value(config::KEY_API_URL))
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Check(args) => check::execute(args, format).await,
        Commands::Scope(args) => scope::execute(args, format).await,
        Commands::Probe(args) => probe::execute(args, &client, format).await,
        Commands::Health => health::execute(&client, format).await.map(|_| true),
        Commands::Config(cmd) => config::execute(cmd, format).await.map(|_| true),
    };

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(DENIED_EXIT_CODE),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}
