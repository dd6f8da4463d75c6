//! docrag CLI entry point.

use anyhow::Result;
use clap::Parser;
use docrag::cli::{commands, Cli, Commands};
use docrag::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("docrag={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_ref().map(|p| Settings::expand_path(p));
    let settings = Settings::load_from(config_path.as_ref())?;

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match cli.command {
        Commands::Index {
            paths,
            dir,
            clear,
            chunk_size,
            chunk_overlap,
        } => {
            let args = commands::IndexArgs {
                paths,
                dir,
                clear,
                chunk_size,
                chunk_overlap,
            };
            commands::run_index(args, settings).await?;
        }

        Commands::Ask {
            question,
            top_k,
            json,
        } => {
            commands::run_ask(&question, top_k, json, cli.verbose > 0, settings).await?;
        }

        Commands::Chat { memory } => {
            commands::run_chat(memory, settings).await?;
        }

        Commands::Info => {
            commands::run_info(settings).await?;
        }

        Commands::Stats => {
            commands::run_stats(settings).await?;
        }

        Commands::Clear { yes } => {
            commands::run_clear(yes, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
