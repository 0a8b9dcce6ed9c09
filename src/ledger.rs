//! The ledger aggregate: chain, pending records and known peers.
//!
//! All mutation goes through `&mut Ledger`, so a single lock around the
//! ledger serializes submits, seals, registrations and chain replacement.

use std::convert::Infallible;

use tracing::info;

use crate::error::ChainError;
use crate::model::{hash_block, now_timestamp, Block, Record};
use crate::peers::PeerRegistry;
use crate::validator::validate_chain;

#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Record>,
    peers: PeerRegistry,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Fresh ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            peers: PeerRegistry::new(),
        }
    }

    /// Restore a ledger from a previously persisted chain.
    pub fn from_chain(chain: Vec<Block>, peers: PeerRegistry) -> Result<Self, ChainError> {
        validate_chain(&chain)?;
        Ok(Self {
            chain,
            pending: Vec::new(),
            peers,
        })
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> usize {
        self.chain.len()
    }

    pub fn last_block(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    pub fn pending(&self) -> &[Record] {
        &self.pending
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    pub fn peers_mut(&mut self) -> &mut PeerRegistry {
        &mut self.peers
    }

    /// Queue a record for the next block; returns that block's index.
    pub fn submit(&mut self, record: Record) -> u64 {
        self.pending.push(record);
        self.last_block().index + 1
    }

    /// Seal the pending records into a new block with `proof`.
    ///
    /// The proof is not checked here; callers verify it against
    /// `last_block().proof` first.
    pub fn seal(&mut self, proof: u64) -> Block {
        match self.try_seal_with(proof, Vec::new(), |_| Ok::<(), Infallible>(())) {
            Ok(block) => block,
            Err(never) => match never {},
        }
    }

    /// Build the next block from the pending records followed by `extra`,
    /// hand it to `persist`, and commit it only if that succeeds.
    ///
    /// On error the chain and the pending buffer are left untouched and
    /// `extra` is discarded.
    pub fn try_seal_with<E>(
        &mut self,
        proof: u64,
        extra: Vec<Record>,
        persist: impl FnOnce(&Block) -> Result<(), E>,
    ) -> Result<Block, E> {
        let last = self.last_block();
        let mut data = self.pending.clone();
        data.extend(extra);
        let block = Block {
            index: last.index + 1,
            timestamp: now_timestamp(),
            data,
            proof,
            previous_hash: hash_block(last),
        };
        persist(&block)?;

        self.pending.clear();
        self.chain.push(block.clone());
        info!(index = block.index, records = block.data.len(), "sealed block");
        Ok(block)
    }

    /// Swap in a chain adopted by consensus. The pending buffer is kept.
    pub(crate) fn replace_chain(&mut self, chain: Vec<Block>) {
        debug_assert!(!chain.is_empty());
        info!(old_len = self.chain.len(), new_len = chain.len(), "replacing local chain");
        self.chain = chain;
    }
}
