//! Reverb API server binary.
//!
//! Serves log queries over an in-memory document store, optionally
//! preloaded from a newline-delimited JSON file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use reverb_api::{ApiConfig, ApiServer, MemoryJobQueue};
use reverb_logs::{LogError, LogRecord, MemoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reverb-api")]
#[command(about = "Reverb workflow log API")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "REVERB_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Allowed CORS origins, comma separated (empty allows any)
    #[arg(long, env = "REVERB_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Maximum records kept in the log store
    #[arg(long, env = "REVERB_STORE_MAX_ENTRIES", default_value_t = reverb_logs::DEFAULT_MAX_ENTRIES)]
    store_max_entries: usize,

    /// Page size when a request gives no limit
    #[arg(long, env = "REVERB_DEFAULT_LIMIT", default_value_t = reverb_logs::DEFAULT_LIMIT)]
    default_limit: usize,

    /// Newline-delimited JSON log records to preload
    #[arg(long)]
    seed: Option<PathBuf>,
}

fn load_seed(store: &MemoryStore, path: &Path) -> anyhow::Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;

    let mut loaded = 0;
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match LogRecord::from_json(line) {
            Ok(record) => {
                store.insert(record);
                loaded += 1;
            }
            Err(LogError::Serialization(e)) => {
                return Err(e)
                    .with_context(|| format!("{}:{}: invalid JSON", path.display(), line_no + 1));
            }
            Err(e) => warn!(line = line_no + 1, error = %e, "skipping seed line"),
        }
    }
    Ok(loaded)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ApiConfig::new(cli.bind)
        .with_store_max_entries(cli.store_max_entries)
        .with_default_limit(cli.default_limit);
    for origin in cli.cors_origins.iter().filter(|o| !o.is_empty()) {
        config = config.with_cors_origin(origin.clone());
    }

    let store = MemoryStore::new(config.store_max_entries);
    if let Some(path) = &cli.seed {
        let loaded = load_seed(&store, path)?;
        info!(loaded, capacity = store.max_entries(), path = %path.display(), "seeded log store");
    }

    info!("Starting Reverb API on {}", config.bind_addr);
    let server = ApiServer::new(config, Arc::new(store), Arc::new(MemoryJobQueue::new()));

    server
        .serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
