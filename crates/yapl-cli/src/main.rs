//! yapl - Yet Another Proton Launcher CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yapl_cli::cmd;
use yapl_cli::ops::{Context, OpsError};
use yapl_cli::ui::Output;
use yapl_cli::{Cli, Commands, Target};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --debug decides the level for our crates
    let default_level = if cli.debug { "yapl=debug" } else { "yapl=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Output::new().error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: &Cli) -> Result<()> {
    let ctx = Context::from_cli(cli)?;
    match &cli.command {
        Commands::Setup => cmd::setup::setup(&ctx, &target(cli)?).await,
        Commands::Run => cmd::run::run(&ctx, &target(cli)?).await,
        Commands::Package => cmd::package::package(&ctx, &target(cli)?, &cli.format).await,
        Commands::Unpackage { archives } => cmd::unpackage::unpackage(&ctx, archives).await,
    }
}

fn target(cli: &Cli) -> Result<Target, OpsError> {
    cli.target().ok_or(OpsError::NoTarget)
}
