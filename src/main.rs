//! Masters CLI entry point

use clap::Parser;
use console::style;
use masters::cli::commands;
use masters::cli::{registry_path, Cli, Commands, LogFormat};
use masters::config::ConfigManager;
use masters::error::MastersResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            } else if e.is_retryable() {
                eprintln!("{} Nothing was cached; rerun to retry", style("Hint:").yellow());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> MastersResult<()> {
    let cli = Cli::parse();

    // 0 = warn (spinners only), 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("masters=warn"),
        1 => EnvFilter::new("masters=info"),
        _ => EnvFilter::new("masters=debug"),
    };

    match cli.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init(),
    }

    masters::ui::init_theme();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;
    debug!("Using config {}", manager.path().display());

    let images = registry_path(cli.images.as_deref(), &config);

    match cli.command {
        Commands::Get(args) => commands::get(args, &config, &images).await,
        Commands::Images(args) => commands::images(args, &images).await,
        Commands::Stage(args) => commands::stage(args, &config, &images).await,
        Commands::Status => commands::status(&config, &images).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}
