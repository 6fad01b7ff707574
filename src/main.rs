//! Mockery - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use mockery::{files, InMemoryStore, MockServer, MockStore, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "mockery",
    about = "Stub HTTP responder - canned responses and upstream proxying for matched requests",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mockery.yaml")]
    config: PathBuf,

    /// Port to listen on (overrides the configuration file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        print!("{}", serde_yaml::to_string(&ServerConfig::default())?);
        return Ok(());
    }

    // Load configuration
    let mut config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        ServerConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load configuration from {:?}", args.config))?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration");
        ServerConfig::default()
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate()?;

    if args.validate {
        println!("Configuration is valid (port {})", config.port);
        return Ok(());
    }

    let store: Arc<dyn MockStore> = Arc::new(InMemoryStore::new());

    if config.auto_import {
        match files::import_into_store(store.as_ref(), &config.import_dir) {
            Ok(statuses) => {
                for status in statuses {
                    info!("{}", status);
                }
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Auto-import skipped"),
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(port = config.port, "Starting mock server");
    let server = MockServer::new(config, store)?;
    server.run(listener).await?;

    Ok(())
}
