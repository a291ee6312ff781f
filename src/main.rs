//! Rango CLI - standalone server for category and page browsing

use clap::Parser;
use rango::config::expand_path;
use rango::{Config, Rango};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rango")]
#[command(author = "Rango Team")]
#[command(version)]
#[command(about = "Rango - category and page browsing service", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.rango/config.toml", env = "RANGO_CONFIG")]
    config: PathBuf,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize a new config file with defaults
    #[arg(long)]
    init: bool,

    /// Load sample categories and pages, then exit
    #[arg(long)]
    populate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = expand_path(&args.config);

    // Load configuration before logging so the log directory is known
    let config_exists = config_path.exists();
    let mut config = if config_exists {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides()?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = init_logging(&config, args.verbose);

    if !config_exists && !args.init {
        tracing::warn!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
    }

    // Handle --init flag
    if args.init {
        if config_exists {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    let rango = Rango::new(config)?;

    if args.populate {
        let summary = rango.populate().await?;
        tracing::info!(
            "Population complete: {} categories and {} pages added",
            summary.categories_created,
            summary.pages_created
        );
        return Ok(());
    }

    rango.start_session_cleanup();

    // Start API server (blocks until shutdown)
    rango.start_api_server().await?;

    Ok(())
}

fn init_logging(
    config: &Config,
    verbose: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rango={},tower_http=debug", log_level).into());

    let (file_layer, guard) = match &config.logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(expand_path(dir), "rango.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}
