//! HTTP routes for submitting records, mining, and reconciling with peers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::consensus::{lock, ChainResponse};
use crate::error::LedgerError;
use crate::model::{Block, Record};
use crate::puzzle::{solve, valid_proof};
use crate::server::{resolve_and_persist, AppState};
use crate::validator::chain_report;
use crate::{peers, storage};

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub index: u64,
}

/// POST /transactions/new
pub async fn new_transaction(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmitResponse>), LedgerError> {
    let record = Record::from_submission(body)?;
    let index = lock(&state.ledger)?.submit(record);
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub data: Vec<Record>,
    pub proof: u64,
    pub previous_hash: String,
}

/// GET /mine
pub async fn mine(State(state): State<AppState>) -> Result<Json<MineResponse>, LedgerError> {
    let last_proof = lock(&state.ledger)?.last_block().proof;

    // Cancelled on shutdown, on timeout, or when this request is dropped.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();
    let search = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || solve(last_proof, &cancel)
    });
    let proof = match tokio::time::timeout(state.mine_timeout, search).await {
        Ok(joined) => joined.map_err(|e| LedgerError::Internal(e.to_string()))?,
        Err(_) => {
            warn!("proof search timed out after {:?}", state.mine_timeout);
            None
        }
    }
    .ok_or(LedgerError::MiningCancelled)?;

    let block: Block = {
        let mut guard = lock(&state.ledger)?;
        if !valid_proof(guard.last_block().proof, proof) {
            return Err(LedgerError::StaleProof);
        }
        // Nothing is committed unless the block reaches disk.
        guard
            .try_seal_with(proof, vec![Record::mining_reward()], |block| {
                storage::save_block(&state.data_dir, block).map_err(|e| {
                    warn!("failed to save block {}: {e}", block.index);
                    LedgerError::from(e)
                })
            })?
    };

    Ok(Json(MineResponse {
        message: "New Block Forged".into(),
        index: block.index,
        data: block.data,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

/// GET /chain
pub async fn full_chain(State(state): State<AppState>) -> Result<Json<ChainResponse>, LedgerError> {
    let chain = lock(&state.ledger)?.chain().to_vec();
    Ok(Json(ChainResponse {
        length: chain.len(),
        chain,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterNodes {
    #[serde(default)]
    pub nodes: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

/// POST /nodes/register
pub async fn register_nodes(
    State(state): State<AppState>,
    Json(body): Json<RegisterNodes>,
) -> Result<(StatusCode, Json<RegisterResponse>), LedgerError> {
    let nodes = body
        .nodes
        .ok_or_else(|| LedgerError::InvalidPeer("please supply a valid list of nodes".into()))?;
    // Reject the whole batch before touching the registry.
    for node in &nodes {
        peers::normalize_address(node)?;
    }

    let mut guard = lock(&state.ledger)?;
    for node in &nodes {
        if guard.peers_mut().register(node)? {
            info!("registered peer {node}");
        }
    }
    storage::save_peers(&state.data_dir, guard.peers())?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "New nodes have been added".into(),
            total_nodes: guard.peers().to_vec(),
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    pub chain: Vec<Block>,
}

/// GET /nodes/resolve
pub async fn consensus(State(state): State<AppState>) -> Result<Json<ResolveResponse>, LedgerError> {
    let replaced = resolve_and_persist(&state).await?;
    let chain = lock(&state.ledger)?.chain().to_vec();
    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Ok(Json(ResolveResponse {
        message: message.into(),
        replaced,
        chain,
    }))
}

/// GET /validate: check every link and proof of the local chain.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResp {
    pub ok: bool,
    pub errors: Vec<String>,
}
pub async fn validate_chain(State(state): State<AppState>) -> Result<Json<ValidateResp>, LedgerError> {
    let errors = chain_report(lock(&state.ledger)?.chain());
    Ok(Json(ValidateResp {
        ok: errors.is_empty(),
        errors,
    }))
}

/// GET /node: hex public key identifying this node, and the build version.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeResp {
    pub node_id: String,
    pub version: String,
}
pub async fn node(State(state): State<AppState>) -> Json<NodeResp> {
    Json(NodeResp {
        node_id: state.identity.node_id(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /health: chain height, queued records and peer count.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResp {
    pub status: String,
    pub height: usize,
    pub pending: usize,
    pub peers: usize,
}
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResp>, LedgerError> {
    let guard = lock(&state.ledger)?;
    Ok(Json(HealthResp {
        status: "ok".into(),
        height: guard.height(),
        pending: guard.pending().len(),
        peers: guard.peers().len(),
    }))
}
