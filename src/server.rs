//! Shared state, router wiring and node startup helpers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::consensus::{self, ChainFetcher};
use crate::crypto::NodeIdentity;
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::{routes, storage};

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
    pub identity: Arc<NodeIdentity>,
    pub fetcher: Arc<dyn ChainFetcher>,
    pub data_dir: PathBuf,
    /// Cancelled on shutdown; proof searches run under child tokens.
    pub shutdown: CancellationToken,
    pub mine_timeout: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/transactions/new", post(routes::new_transaction))
        .route("/mine", get(routes::mine))
        .route("/chain", get(routes::full_chain))
        .route("/nodes/register", post(routes::register_nodes))
        .route("/nodes/resolve", get(routes::consensus))
        .route("/validate", get(routes::validate_chain))
        .route("/node", get(routes::node))
        .route("/health", get(routes::health))
        .with_state(state)
}

/// Restore the ledger from `data_dir`, or start a fresh chain.
///
/// A stored chain that fails validation, or has a block file that does not
/// parse, is moved aside and replaced by a new genesis block. `seed_peers`
/// are registered on top of the stored peer set.
pub fn open_ledger(data_dir: &Path, seed_peers: &[String]) -> std::io::Result<Ledger> {
    let mut peers = storage::load_peers(data_dir)?;
    for address in seed_peers {
        if let Err(e) = peers.register(address) {
            warn!("ignoring configured peer: {e}");
        }
    }
    storage::save_peers(data_dir, &peers)?;

    let rejected = match storage::load_blocks(data_dir) {
        Ok(blocks) if blocks.is_empty() => None,
        Ok(blocks) => {
            let count = blocks.len();
            match Ledger::from_chain(blocks, peers.clone()) {
                Ok(ledger) => {
                    info!("restored {count} block(s) from disk");
                    return Ok(ledger);
                }
                Err(e) => Some(e.to_string()),
            }
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => Some(e.to_string()),
        Err(e) => return Err(e),
    };
    if let Some(reason) = rejected {
        let moved = storage::quarantine_blocks(data_dir)?;
        warn!(
            "stored chain is invalid ({reason}); moved to {} and starting fresh",
            moved.display()
        );
    }

    let mut ledger = Ledger::new();
    *ledger.peers_mut() = peers;
    storage::save_chain(data_dir, ledger.chain())?;
    info!("created genesis block");
    Ok(ledger)
}

/// One consensus pass; a replaced chain is written back to disk.
pub async fn resolve_and_persist(state: &AppState) -> Result<bool, LedgerError> {
    let replaced = consensus::resolve(&state.ledger, state.fetcher.as_ref()).await?;
    if replaced {
        let guard = consensus::lock(&state.ledger)?;
        storage::save_chain(&state.data_dir, guard.chain())?;
    }
    Ok(replaced)
}

/// Resolve against peers every `every` until `state.shutdown` fires.
pub fn spawn_periodic_resolution(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = interval.tick() => match resolve_and_persist(&state).await {
                    Ok(true) => info!("background resolution adopted a peer chain"),
                    Ok(false) => {}
                    Err(e) => warn!("background resolution failed: {e}"),
                },
            }
        }
        info!("background resolution stopped");
    })
}
