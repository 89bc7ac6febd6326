//! dircache - signed build cache transfers
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use dircache::cli::{Cli, Commands};
use dircache::config::ConfigManager;
use dircache::error::DircacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            match e.hint() {
                Some(hint) => eprintln!("{} {}", style("Hint:").yellow(), hint),
                // Anything else is an environment problem, not a settings one
                None if !e.is_compile_time() => {
                    eprintln!("{} rerun with -vv for details", style("Hint:").yellow())
                }
                None => {}
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DircacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("dircache=warn"),
        1 => EnvFilter::new("dircache=info"),
        _ => EnvFilter::new("dircache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!("Loaded configuration from {}", config_manager.path().display());

    match cli.command {
        Commands::Url(args) => dircache::cli::commands::url(args, &config).await,
        Commands::Plan(args) => dircache::cli::commands::plan(args, &config).await,
        Commands::Fetch(args) => dircache::cli::commands::fetch(args, &config).await,
        Commands::Push(args) => dircache::cli::commands::push(args, &config).await,
        Commands::Config(args) => {
            dircache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
