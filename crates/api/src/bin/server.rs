//! Coordinator server binary.
//!
//! Configuration comes from the environment:
//! - `COMMITD_NODE_ID`       node identity reported on /status (default COORD)
//! - `COMMITD_BIND_ADDR`     listen address (default 0.0.0.0:8000)
//! - `COMMITD_PARTICIPANTS`  comma-separated participant base URLs (required)
//! - `COMMITD_WAL_PATH`      write-ahead log file (default /tmp/commitd.wal)

use anyhow::{bail, Context, Result};
use commitd_api::{start_server, AppState};
use commitd_coordinator::{CommitCoordinator, CoordinatorConfig};
use commitd_storage::{TransactionStore, WriteAheadLog};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct ServerConfig {
    node_id: String,
    bind_addr: SocketAddr,
    participants: Vec<String>,
    wal_path: PathBuf,
}

fn load_config() -> Result<ServerConfig> {
    let node_id = std::env::var("COMMITD_NODE_ID").unwrap_or_else(|_| "COORD".to_string());

    let bind_addr = std::env::var("COMMITD_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()
        .context("invalid COMMITD_BIND_ADDR")?;

    let participants: Vec<String> = std::env::var("COMMITD_PARTICIPANTS")
        .context("COMMITD_PARTICIPANTS is required (comma-separated base URLs)")?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if participants.is_empty() {
        bail!("COMMITD_PARTICIPANTS must name at least one participant");
    }

    let wal_path = std::env::var("COMMITD_WAL_PATH")
        .unwrap_or_else(|_| "/tmp/commitd.wal".to_string())
        .into();

    Ok(ServerConfig {
        node_id,
        bind_addr,
        participants,
        wal_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    info!(
        "[{}] starting coordinator, participants: {:?}",
        config.node_id, config.participants
    );

    let wal = Arc::new(WriteAheadLog::open(&config.wal_path)?);
    let store = Arc::new(TransactionStore::new());

    // restore what the log remembers before accepting requests
    let restored = store.restore(wal.replay()?, &config.participants).await;
    if restored > 0 {
        info!(
            "[{}] restored {} transactions from {}",
            config.node_id,
            restored,
            config.wal_path.display()
        );
    }

    let coordinator = Arc::new(CommitCoordinator::new(
        config.node_id.clone(),
        CoordinatorConfig::default(),
        store.clone(),
        wal,
        config.participants.clone(),
    )?);

    let state = AppState::new(coordinator, store, config.node_id, config.participants);
    start_server(config.bind_addr, state).await?;
    Ok(())
}
