//! Disk snapshots of the chain (one JSON file per block) and the peer set.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::Block;
use crate::peers::PeerRegistry;

const BLOCKS_DIR: &str = "blocks";
const PEERS_FILE: &str = "peers.json";

fn blocks_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(BLOCKS_DIR)
}

/// Compute the JSON filename for a block index.
pub fn block_path(data_dir: &Path, index: u64) -> PathBuf {
    blocks_dir(data_dir).join(format!("block_{index}.json"))
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = File::create(path)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

/// Write a block to disk as `blocks/block_<index>.json` (pretty-printed).
pub fn save_block(data_dir: &Path, block: &Block) -> io::Result<()> {
    fs::create_dir_all(blocks_dir(data_dir))?;
    write_json(&block_path(data_dir, block.index), block)
}

/// Replace every stored block with `chain`.
pub fn save_chain(data_dir: &Path, chain: &[Block]) -> io::Result<()> {
    let dir = blocks_dir(data_dir);
    fs::create_dir_all(&dir)?;
    for entry in fs::read_dir(&dir)? {
        let p = entry?.path();
        if p.extension().and_then(|s| s.to_str()) == Some("json") {
            fs::remove_file(p)?;
        }
    }
    for block in chain {
        save_block(data_dir, block)?;
    }
    Ok(())
}

/// Load all stored blocks, sorted by index.
///
/// A block file that does not parse fails the whole load with
/// `ErrorKind::InvalidData`; a partial chain is never returned.
pub fn load_blocks(data_dir: &Path) -> io::Result<Vec<Block>> {
    let dir = blocks_dir(data_dir);
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut out = vec![];
    for entry in fs::read_dir(&dir)? {
        let p = entry?.path();
        if p.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let mut buf = String::new();
        File::open(&p)?.read_to_string(&mut buf)?;
        let block = serde_json::from_str::<Block>(&buf).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unreadable block file {}: {e}", p.display()),
            )
        })?;
        out.push(block);
    }
    out.sort_by_key(|b| b.index);
    Ok(out)
}

/// Move the blocks directory aside so a fresh chain can be written.
pub fn quarantine_blocks(data_dir: &Path) -> io::Result<PathBuf> {
    let stamp = time::OffsetDateTime::now_utc().unix_timestamp();
    let target = data_dir.join(format!("{BLOCKS_DIR}.rejected-{stamp}"));
    fs::rename(blocks_dir(data_dir), &target)?;
    Ok(target)
}

pub fn save_peers(data_dir: &Path, peers: &PeerRegistry) -> io::Result<()> {
    fs::create_dir_all(data_dir)?;
    write_json(&data_dir.join(PEERS_FILE), &peers.to_vec())
}

pub fn load_peers(data_dir: &Path) -> io::Result<PeerRegistry> {
    let path = data_dir.join(PEERS_FILE);
    let mut peers = PeerRegistry::new();
    if !path.exists() {
        return Ok(peers);
    }
    let addresses: Vec<String> = serde_json::from_str(&fs::read_to_string(&path)?)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    for address in addresses {
        if let Err(e) = peers.register(&address) {
            warn!("ignoring stored peer: {e}");
        }
    }
    Ok(peers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::model::Record;
    use crate::puzzle::solve;
    use tokio_util::sync::CancellationToken;

    fn two_block_chain() -> Vec<Block> {
        let mut ledger = Ledger::new();
        ledger.submit(Record::mining_reward());
        let proof = solve(ledger.last_block().proof, &CancellationToken::new()).unwrap();
        ledger.seal(proof);
        ledger.chain().to_vec()
    }

    #[test]
    fn blocks_round_trip_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let chain = two_block_chain();
        for block in chain.iter().rev() {
            save_block(dir.path(), block).unwrap();
        }
        fs::write(blocks_dir(dir.path()).join("notes.txt"), "x").unwrap();
        assert_eq!(load_blocks(dir.path()).unwrap(), chain);
    }

    #[test]
    fn save_chain_drops_stale_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let chain = two_block_chain();
        save_chain(dir.path(), &chain).unwrap();
        save_chain(dir.path(), &chain[..1]).unwrap();
        assert_eq!(load_blocks(dir.path()).unwrap(), chain[..1].to_vec());
    }

    #[test]
    fn corrupt_block_file_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let chain = two_block_chain();
        save_chain(dir.path(), &chain).unwrap();
        fs::write(block_path(dir.path(), 2), "{\"index\": 2, \"timest").unwrap();

        let err = load_blocks(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("block_2.json"));
    }

    #[test]
    fn missing_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("fresh");
        assert!(load_blocks(&data).unwrap().is_empty());
        assert!(load_peers(&data).unwrap().is_empty());
    }

    #[test]
    fn peers_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut peers = PeerRegistry::new();
        peers.register("http://10.0.0.1:5000").unwrap();
        peers.register("10.0.0.2:5000").unwrap();
        save_peers(dir.path(), &peers).unwrap();
        assert_eq!(load_peers(dir.path()).unwrap(), peers);
    }
}
