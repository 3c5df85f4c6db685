//! Watchtower CLI, the main entry point.
//!
//! Modes:
//! - `watchtower -t <target>`: run an assessment against an authorized target
//! - `watchtower --report <file>`: write a Markdown report from stored findings

use std::path::PathBuf;

use clap::Parser;
use watchtower_config::{CliOverrides, parse_auth_pair};

mod commands;

#[derive(Parser)]
#[command(
    name = "watchtower",
    about = "Watchtower: LLM-driven penetration testing loop",
    version,
    author
)]
struct Cli {
    /// Target domain, IP address or URL (must be authorized for testing)
    #[arg(short, long, required_unless_present = "report")]
    target: Option<String>,

    /// Permit every declared tool instead of only the installed ones
    #[arg(long)]
    skip_ask_tools: bool,

    /// Restrict the run to these tools (comma-separated)
    #[arg(long, value_delimiter = ',')]
    tools: Vec<String>,

    /// LLM provider name or OpenAI-compatible base URL
    #[arg(long)]
    provider: Option<String>,

    /// Model name for the provider
    #[arg(long)]
    model: Option<String>,

    /// Name of the environment variable holding the API key
    #[arg(long = "apikey")]
    api_key_env: Option<String>,

    /// Header or cookie to inject into tools that support auth (KEY=VALUE, repeatable)
    #[arg(long = "auth", value_name = "KEY=VALUE")]
    auth: Vec<String>,

    /// Write a Markdown report of stored findings to this file and exit
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let auth = cli
        .auth
        .iter()
        .map(|raw| parse_auth_pair(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let overrides = CliOverrides {
        provider: cli.provider,
        model: cli.model,
        api_key_env: cli.api_key_env,
        auth,
    };

    if let Some(path) = cli.report {
        return commands::report::run(&path, overrides).await;
    }

    let target = cli.target.ok_or("A target is required (-t/--target)")?;
    commands::run::run(commands::run::RunArgs {
        target,
        tools: cli.tools,
        skip_ask_tools: cli.skip_ask_tools,
        overrides,
    })
    .await
}
