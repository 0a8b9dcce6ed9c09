//! Data model for session records, blocks and the canonical block hash.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::error::LedgerError;

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Proof stored in the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// Fields a submission must carry before it is accepted into the pending buffer.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "users",
    "data",
    "dh_parameters",
    "server_public_key",
    "receiver_public_key",
    "sender_public_key",
];

const PENDING: &str = "Pending";
const COMPLETED: &str = "Completed";

/// One session record. The ledger stores and hashes these fields but never
/// interprets them; any JSON value is kept as submitted. Defaults only apply
/// to keys that are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub users: Value,
    #[serde(default = "empty_list")]
    pub data: Value,
    pub dh_parameters: Value,
    pub server_public_key: Value,
    pub receiver_public_key: Value,
    pub sender_public_key: Value,
    #[serde(default = "pending")]
    pub sender_zkp_status: Value,
    #[serde(default = "pending")]
    pub receiver_zkp_status: Value,
    #[serde(default = "zero")]
    pub sender_balance: Value,
    #[serde(default = "zero")]
    pub receiver_balance: Value,
    #[serde(default = "pending")]
    pub authentification: Value,
    #[serde(rename = "Sufficient_amount", default = "pending")]
    pub sufficient_amount: Value,
    #[serde(default = "empty_string")]
    pub sender_wallet_hash: Value,
    #[serde(default = "empty_string")]
    pub receiver_wallet_hash: Value,
}

fn pending() -> Value {
    Value::from(PENDING)
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

fn empty_string() -> Value {
    Value::from("")
}

fn zero() -> Value {
    Value::from(0)
}

impl Record {
    /// Build a record from a raw submission body.
    ///
    /// Every name in [`REQUIRED_FIELDS`] must be present (a JSON `null` counts
    /// as present); optional fields fall back to their defaults.
    pub fn from_submission(body: Value) -> Result<Self, LedgerError> {
        let Value::Object(fields) = body else {
            return Err(LedgerError::InvalidSubmission(
                "submission must be a JSON object".into(),
            ));
        };
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|name| !fields.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(LedgerError::InvalidSubmission(format!(
                "missing values: {}",
                missing.join(", ")
            )));
        }
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| LedgerError::InvalidSubmission(e.to_string()))
    }

    /// Record queued by a node for the block it mines.
    pub fn mining_reward() -> Self {
        let completed = Value::from(COMPLETED);
        Self {
            users: Value::from("0"),
            data: empty_list(),
            dh_parameters: empty_string(),
            server_public_key: empty_string(),
            receiver_public_key: empty_string(),
            sender_public_key: empty_string(),
            sender_zkp_status: completed.clone(),
            receiver_zkp_status: completed.clone(),
            sender_balance: zero(),
            receiver_balance: zero(),
            authentification: completed.clone(),
            sufficient_amount: completed,
            sender_wallet_hash: empty_string(),
            receiver_wallet_hash: empty_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-indexed position in the chain.
    pub index: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Records sealed into this block, in submission order.
    pub data: Vec<Record>,
    /// Puzzle solution relative to the previous block's proof.
    pub proof: u64,
    /// Hex SHA-256 of the previous block, or "1" for genesis.
    pub previous_hash: String,
}

impl Block {
    pub fn genesis() -> Self {
        Self {
            index: 1,
            timestamp: now_timestamp(),
            data: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }
}

/// Current wall-clock time as fractional Unix seconds.
pub fn now_timestamp() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}

/// SHA-256 of `parts` concatenated, as lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Hash of a block over its canonical JSON form (keys sorted at every depth).
pub fn hash_block(block: &Block) -> String {
    let value = serde_json::json!({
        "index": block.index,
        "timestamp": block.timestamp,
        "data": block.data,
        "proof": block.proof,
        "previous_hash": block.previous_hash,
    });
    hash_concat(&[canonicalize(value).to_string().as_bytes()])
}

/// Rebuild every object with its keys in sorted order, so the encoding does
/// not depend on how `serde_json::Map` orders entries.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
