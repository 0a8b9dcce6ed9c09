//! Node identity: a persisted Ed25519 key whose public half names this node.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

pub struct NodeIdentity {
    signing: SigningKey,
}

impl NodeIdentity {
    pub fn generate() -> Self {
        let mut rng = OsRng;
        Self {
            signing: SigningKey::generate(&mut rng),
        }
    }

    /// Load the key at `path`, or generate and persist a new one.
    pub fn load_or_create(path: &Path) -> io::Result<Self> {
        if let Some(signing) = load_key(path)? {
            info!("loaded node key from {}", path.display());
            return Ok(Self { signing });
        }
        info!("no node key at {}; generating one", path.display());
        let identity = Self::generate();
        save_key(path, &identity.signing)?;
        Ok(identity)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Hex-encoded public key.
    pub fn node_id(&self) -> String {
        hex::encode(self.verifying_key().to_bytes())
    }
}

fn save_key(path: &Path, signing: &SigningKey) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, signing.to_bytes())
}

/// `None` when there is no key file or it does not hold a 32-byte seed.
fn load_key(path: &Path) -> io::Result<Option<SigningKey>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    match <[u8; 32]>::try_from(bytes.as_slice()) {
        Ok(seed) => Ok(Some(SigningKey::from_bytes(&seed))),
        Err(_) => {
            warn!("key file {} is not a 32-byte seed; replacing it", path.display());
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("key.bin");
        let first = NodeIdentity::load_or_create(&path).unwrap();
        let second = NodeIdentity::load_or_create(&path).unwrap();
        assert_eq!(first.node_id(), second.node_id());
        assert_eq!(first.node_id().len(), 64);
    }

    #[test]
    fn malformed_key_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.bin");
        fs::write(&path, b"short").unwrap();
        let identity = NodeIdentity::load_or_create(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), 32);
        assert_eq!(
            identity.node_id(),
            NodeIdentity::load_or_create(&path).unwrap().node_id()
        );
    }
}
