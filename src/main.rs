//! Mapping gateway management binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   mappings/*.xml ──▶ DirectorySource ──▶ parser ──▶ pattern compiler ──▶ VersionTable
//!                                                                              │
//!   plugins.toml ───▶ PluginArchive ─┐                                         ▼
//!                                    ├──▶ ImplementationResolver ──▶ Snapshot (ArcSwap)
//!   BuiltinRegistry ─────────────────┘                                         │
//!                                                                              ▼
//!   proxy layer ──── resolve(version, method, path) ─────────────────▶ ResolvedRoute
//! ```
//!
//! Commands:
//! - `check`: load every descriptor once and report errors
//! - `versions`: list loaded API versions
//! - `resolve`: resolve one request and print the route
//! - `serve`: keep the store loaded, reload on change or SIGHUP

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use clap::{Parser, Subcommand};

use mapping_gateway::config::{load_config, GatewayConfig, MappingWatcher};
use mapping_gateway::lifecycle::{next_signal, Signal};
use mapping_gateway::observability::logging;
use mapping_gateway::{BuiltinRegistry, DirectorySource, MappingStore};

#[derive(Parser)]
#[command(name = "mapping-gateway")]
#[command(about = "Load, inspect and serve API gateway mapping descriptors", long_about = None)]
struct Cli {
    /// Gateway settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the descriptor directory from the settings file.
    #[arg(short, long)]
    mappings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every descriptor without serving
    Check,
    /// List loaded API versions
    Versions,
    /// Resolve a single request
    Resolve {
        version: String,
        method: String,
        path: String,
    },
    /// Keep mappings loaded and reload on change or SIGHUP
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(mappings) = cli.mappings {
        config.mappings.path = mappings;
    }

    logging::init(&config.observability.log_level);

    tracing::info!(
        mappings = %config.mappings.path.display(),
        plugin_path = ?config.mappings.plugin_path,
        eager_resolution = config.mappings.eager_resolution,
        "Configuration loaded"
    );

    let store = Arc::new(MappingStore::new(
        DirectorySource::new(&config.mappings.path),
        Arc::new(BuiltinRegistry::new()),
        config.mappings.store_settings(),
    ));
    let generation = store.reload()?;

    match cli.command {
        Commands::Check => {
            println!(
                "OK: generation {generation}, {} version(s)",
                store.list_versions().len()
            );
        }
        Commands::Versions => {
            for version in store.list_versions() {
                println!("{version}");
            }
        }
        Commands::Resolve {
            version,
            method,
            path,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            match store.resolve(&version, &method, &path) {
                Ok(route) => {
                    println!("backend:  {}{}", route.backend, route.backend_path);
                    for action in &route.actions {
                        println!("action:   {} ({})", action.name, action.implementation_id);
                    }
                    if let Some(filter) = &route.filter {
                        println!("filter:   {} ({})", filter.name, filter.implementation_id);
                    }
                }
                Err(miss) => {
                    eprintln!("{miss}: {}", store.error_message(&version, 404));
                    std::process::exit(1);
                }
            }
        }
        Commands::Serve => serve(&config, store).await?,
    }

    Ok(())
}

async fn serve(
    config: &GatewayConfig,
    store: Arc<MappingStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    // The watcher handle must outlive the serve loop.
    let (_watcher, mut updates) = if config.mappings.watch {
        let (watcher, updates) = MappingWatcher::new(
            &config.mappings.path,
            Arc::clone(&store),
            Duration::from_secs(config.mappings.watch_poll_secs),
        );
        (Some(watcher.run()?), Some(updates))
    } else {
        (None, None)
    };

    tracing::info!(versions = ?store.list_versions(), "Serving mappings");

    loop {
        tokio::select! {
            Some(generation) = async {
                match updates.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                tracing::info!(generation, versions = ?store.list_versions(), "Watcher published new mappings");
            }
            signal = next_signal() => match signal? {
                Signal::Reload => {
                    let store = Arc::clone(&store);
                    match tokio::task::spawn_blocking(move || store.reload_queued()).await? {
                        Ok(generation) => tracing::info!(generation, "SIGHUP reload published new mappings"),
                        Err(e) => tracing::warn!("SIGHUP reload failed: {}. Keeping current mappings.", e),
                    }
                }
                Signal::Shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            },
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
