mod cli;
mod commands;
mod logging;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;
use rolegate::{RbacConfig, RbacEngine, RuleRegistry, TokenProvider};

/// Exit code when access is denied.
const EXIT_DENIED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing_with_level(&cli.log_level);

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_DENIED),
        Err(e) => {
            print_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the command's answer is a denial.
async fn run(cli: &Cli) -> Result<bool> {
    let engine = make_engine(cli)?;
    let format = cli.format.unwrap_or_default();

    match &cli.command {
        Commands::Check(args) => commands::check::check(&engine, args, format).await,
        Commands::Roles(args) => commands::roles::roles(&engine, args, format).await,
        Commands::Inspect(args) => {
            commands::inspect::inspect(&engine, args, format).await?;
            Ok(true)
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<RbacConfig> {
    let mut config = match &cli.config {
        Some(path) => RbacConfig::from_file(path)?,
        None => RbacConfig::default(),
    };

    if let Some(url) = &cli.url {
        config.source.base_url = url.clone();
    }
    if let Some(path) = &cli.path {
        config.source.path = path.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn make_engine(cli: &Cli) -> Result<RbacEngine> {
    let config = resolve_config(cli)?;
    tracing::debug!(url = %config.source.base_url, path = %config.source.path, "Using policy source");

    let token_provider: Option<TokenProvider> = cli.token.clone().map(|token| {
        let provider: TokenProvider = Arc::new(move || Some(token.clone()));
        provider
    });

    Ok(RbacEngine::from_config(
        &config,
        RuleRegistry::with_builtin_rules(),
        token_provider,
    )?)
}
