//! Structural validation of a whole chain: genesis sentinel, hash links,
//! consecutive indices and puzzle proofs. Record contents are never inspected.

use crate::error::ChainError;
use crate::model::{hash_block, Block, GENESIS_PREVIOUS_HASH};
use crate::puzzle::valid_proof;

pub fn validate_chain(chain: &[Block]) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::EmptyChain)?;
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::BadGenesis(genesis.previous_hash.clone()));
    }
    for pair in chain.windows(2) {
        if let Some(err) = link_errors(&pair[0], &pair[1]).into_iter().next() {
            return Err(err);
        }
    }
    Ok(())
}

pub fn is_valid_chain(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}

/// Every violation in `chain`, one message per problem, for operator display.
pub fn chain_report(chain: &[Block]) -> Vec<String> {
    let Some(genesis) = chain.first() else {
        return vec![ChainError::EmptyChain.to_string()];
    };
    let mut errors = vec![];
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        errors.push(ChainError::BadGenesis(genesis.previous_hash.clone()));
    }
    for pair in chain.windows(2) {
        errors.extend(link_errors(&pair[0], &pair[1]));
    }
    errors.iter().map(ToString::to_string).collect()
}

fn link_errors(prev: &Block, cur: &Block) -> Vec<ChainError> {
    let mut errors = vec![];
    if cur.previous_hash != hash_block(prev) {
        errors.push(ChainError::BrokenChain { index: cur.index });
    }
    if prev.index.checked_add(1) != Some(cur.index) {
        errors.push(ChainError::IndexGap {
            index: cur.index,
            previous: prev.index,
        });
    }
    if !valid_proof(prev.proof, cur.proof) {
        errors.push(ChainError::InvalidProof { index: cur.index });
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::model::Record;
    use crate::puzzle::solve;
    use tokio_util::sync::CancellationToken;

    fn mined_ledger(blocks: usize) -> Ledger {
        let token = CancellationToken::new();
        let mut ledger = Ledger::new();
        for _ in 1..blocks {
            ledger.submit(Record::mining_reward());
            let proof = solve(ledger.last_block().proof, &token).unwrap();
            ledger.seal(proof);
        }
        ledger
    }

    #[test]
    fn empty_chain_is_invalid() {
        assert_eq!(validate_chain(&[]), Err(ChainError::EmptyChain));
        assert!(!chain_report(&[]).is_empty());
    }

    #[test]
    fn genesis_only_is_valid() {
        assert!(is_valid_chain(Ledger::new().chain()));
    }

    #[test]
    fn sealed_chain_is_valid() {
        let ledger = mined_ledger(4);
        assert_eq!(validate_chain(ledger.chain()), Ok(()));
        assert!(chain_report(ledger.chain()).is_empty());
        for pair in ledger.chain().windows(2) {
            assert_eq!(pair[1].previous_hash, hash_block(&pair[0]));
        }
    }

    #[test]
    fn sealed_chain_stays_valid_after_json_transfer() {
        let chain = mined_ledger(40).chain().to_vec();
        let text = serde_json::to_string(&chain).unwrap();
        let received: Vec<Block> = serde_json::from_str(&text).unwrap();
        assert_eq!(validate_chain(&received), Ok(()));
        for (sent, got) in chain.iter().zip(&received) {
            assert_eq!(hash_block(got), hash_block(sent));
        }
    }

    #[test]
    fn tampered_record_breaks_link() {
        let mut chain = mined_ledger(3).chain().to_vec();
        chain[1].data[0].users = serde_json::json!("mallory");
        assert_eq!(
            validate_chain(&chain),
            Err(ChainError::BrokenChain { index: 3 })
        );
    }

    #[test]
    fn bad_proof_is_rejected() {
        let mut chain = mined_ledger(2).chain().to_vec();
        let last = chain.len() - 1;
        chain[last].proof += 1;
        while valid_proof(chain[last - 1].proof, chain[last].proof) {
            chain[last].proof += 1;
        }
        assert_eq!(
            validate_chain(&chain),
            Err(ChainError::InvalidProof { index: 2 })
        );
    }

    #[test]
    fn index_gap_is_rejected() {
        let mut chain = mined_ledger(2).chain().to_vec();
        chain[1].index = 5;
        assert_eq!(
            validate_chain(&chain),
            Err(ChainError::IndexGap {
                index: 5,
                previous: 1
            })
        );
    }

    #[test]
    fn genesis_sentinel_is_required() {
        let mut chain = Ledger::new().chain().to_vec();
        chain[0].previous_hash = "0".into();
        assert_eq!(
            validate_chain(&chain),
            Err(ChainError::BadGenesis("0".into()))
        );
    }
}
