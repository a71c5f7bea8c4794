//! Imagix - path-addressed image derivative cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use imagix::cli::{commands, Cli, Commands};
use imagix::config::{Config, ConfigManager};
use imagix::error::ImagixResult;
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
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ImagixResult<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", manager.path().display());

    // Flags and environment win over the config file
    if let Some(source) = cli.source_root {
        config.paths.source = Some(source);
    }
    if let Some(destination) = cli.destination_root {
        config.paths.destination = Some(destination);
    }

    match cli.command {
        Commands::Url(args) => commands::url(args, &config).await,
        Commands::Source(args) => commands::source(args, &config).await,
        Commands::Effective(args) => commands::effective(args, &config).await,
        Commands::Compile(args) => commands::compile(args, &config).await,
        Commands::Send(args) => commands::send(args, &config).await,
        Commands::Unlink(args) => commands::unlink(args, &config).await,
        Commands::Remove(args) => commands::remove(args, &config).await,
        Commands::Formats(args) => commands::formats(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}

/// Logs go to stderr; stdout carries command output and CGI responses
fn init_logging(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("imagix=warn"),
        1 => EnvFilter::new("imagix=info"),
        _ => EnvFilter::new("imagix=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
