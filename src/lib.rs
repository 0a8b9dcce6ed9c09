//! Hash-linked ledger of session records with a longest-valid-chain
//! consensus rule for reconciling independent nodes.

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod model;
pub mod network;
pub mod peers;
pub mod puzzle;
pub mod routes;
pub mod server;
pub mod storage;
pub mod validator;

pub use consensus::{resolve, ChainFetcher, ChainResponse};
pub use error::{ChainError, LedgerError, PeerError};
pub use ledger::Ledger;
pub use model::{hash_block, Block, Record};
pub use validator::{is_valid_chain, validate_chain};
