use anyhow::Context;
use clap::Parser;

mod cli;
mod client;
mod commands;
mod config;
mod context;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("gsr error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    init_tracing(cli.verbose)?;

    let config = config::ClientConfig::load()
        .context("failed to load client configuration")?
        .with_overrides(cli.gateway, cli.token);

    let ctx = context::ClientContext::from_config(config)
        .context("failed to initialize client context")?;

    commands::dispatch(cli.command, &ctx).await
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // stdout carries command output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
