//! Hash-prefix puzzle gating who may seal the next block.
//!
//! A proof `p` is valid after `last` when `sha256("{last}{p}")` in hex starts
//! with [`DIFFICULTY_PREFIX`]. Every node must agree on this rule or their
//! chains stop being comparable.

use tokio_util::sync::CancellationToken;

use crate::model::hash_concat;

pub const DIFFICULTY_PREFIX: &str = "0000";

pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    let guess = format!("{last_proof}{proof}");
    hash_concat(&[guess.as_bytes()]).starts_with(DIFFICULTY_PREFIX)
}

/// Smallest proof valid after `last_proof`, searching upward from 0.
///
/// Returns `None` once `cancel` fires. CPU-bound: run it on a blocking thread.
pub fn solve(last_proof: u64, cancel: &CancellationToken) -> Option<u64> {
    let mut proof = 0u64;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        if valid_proof(last_proof, proof) {
            return Some(proof);
        }
        proof = proof.checked_add(1)?;
    }
}
