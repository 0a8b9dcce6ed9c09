//! Error types shared by the ledger core and the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Why a chain failed validation. Only ever disqualifies a candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain is empty")]
    EmptyChain,
    #[error("genesis block has previous_hash {0:?}")]
    BadGenesis(String),
    #[error("block {index} previous_hash does not match the preceding block")]
    BrokenChain { index: u64 },
    #[error("block {index} follows block {previous}")]
    IndexGap { index: u64, previous: u64 },
    #[error("block {index} proof is not valid against the previous proof")]
    InvalidProof { index: u64 },
}

/// Failure to obtain a candidate chain from a peer.
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("peer {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },
    #[error("peer {address} returned malformed chain: {reason}")]
    Malformed { address: String, reason: String },
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    #[error("invalid peer address: {0}")]
    InvalidPeer(String),
    #[error("chain changed while solving; retry")]
    StaleProof,
    #[error("proof search cancelled")]
    MiningCancelled,
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::InvalidSubmission(_) | LedgerError::InvalidPeer(_) => {
                StatusCode::BAD_REQUEST
            }
            LedgerError::StaleProof => StatusCode::CONFLICT,
            LedgerError::MiningCancelled => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::Storage(_) | LedgerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
