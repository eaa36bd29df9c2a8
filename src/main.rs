mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// Use mimalloc to keep memory flat under concurrent audits.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use webaudit_core::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Serve { listen } => commands::run_serve(config, listen).await,
        Commands::Audit {
            url,
            nocache,
            snapshot,
            pretty,
        } => commands::run_audit(config, &url, nocache, snapshot, pretty).await,
    }
}
