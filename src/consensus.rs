//! Longest-valid-chain conflict resolution against known peers.
//!
//! Peer chains are fetched concurrently without holding the ledger lock. The
//! lock is taken only to snapshot the peer list and, afterwards, to pick the
//! winner against the local chain as it stands at that moment.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, PeerError};
use crate::ledger::Ledger;
use crate::model::Block;
use crate::validator::validate_chain;

/// Body served by `GET /chain` and expected from peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub length: usize,
    pub chain: Vec<Block>,
}

/// Source of peer chains. The HTTP implementation lives in
/// [`crate::network`]; tests substitute canned chains.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, address: &str) -> Result<ChainResponse, PeerError>;
}

/// Pick the longest valid candidate strictly longer than `local_len`.
///
/// Candidates are considered in the order given; on equal lengths the first
/// one seen wins.
pub fn select_longest<I>(local_len: usize, candidates: I) -> Option<Vec<Block>>
where
    I: IntoIterator<Item = (String, Result<ChainResponse, PeerError>)>,
{
    let mut best: Option<Vec<Block>> = None;
    let mut best_len = local_len;

    for (address, result) in candidates {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("skipping peer: {e}");
                continue;
            }
        };
        if response.length != response.chain.len() {
            let e = PeerError::Malformed {
                address,
                reason: format!(
                    "reported length {} but sent {} blocks",
                    response.length,
                    response.chain.len()
                ),
            };
            warn!("skipping peer: {e}");
            continue;
        }
        if response.length <= best_len {
            debug!(peer = %address, length = response.length, best_len, "peer chain not longer");
            continue;
        }
        match validate_chain(&response.chain) {
            Ok(()) => {
                debug!(peer = %address, length = response.length, "new best chain");
                best_len = response.length;
                best = Some(response.chain);
            }
            Err(e) => warn!(peer = %address, "rejecting peer chain: {e}"),
        }
    }
    best
}

/// Run one resolution pass; returns whether the local chain was replaced.
pub async fn resolve<F>(ledger: &Mutex<Ledger>, fetcher: &F) -> Result<bool, LedgerError>
where
    F: ChainFetcher + ?Sized,
{
    let peers = lock(ledger)?.peers().to_vec();
    if peers.is_empty() {
        debug!("no peers registered; nothing to resolve");
        return Ok(false);
    }

    let results = join_all(peers.iter().map(|address| fetcher.fetch_chain(address))).await;

    let mut guard = lock(ledger)?;
    let local_len = guard.height();
    match select_longest(local_len, peers.into_iter().zip(results)) {
        Some(chain) => {
            guard.replace_chain(chain);
            Ok(true)
        }
        None => {
            info!(length = local_len, "local chain is authoritative");
            Ok(false)
        }
    }
}

pub(crate) fn lock(ledger: &Mutex<Ledger>) -> Result<std::sync::MutexGuard<'_, Ledger>, LedgerError> {
    ledger
        .lock()
        .map_err(|_| LedgerError::Internal("ledger lock poisoned".into()))
}
