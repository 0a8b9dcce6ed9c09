//! Registry of peer node addresses consulted during consensus resolution.

use std::collections::BTreeSet;

use reqwest::Url;

use crate::error::LedgerError;

/// Deduplicated peer addresses in `host[:port]` form, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerRegistry {
    addresses: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer; returns `false` if it was already known.
    pub fn register(&mut self, address: &str) -> Result<bool, LedgerError> {
        let address = normalize_address(address)?;
        Ok(self.addresses.insert(address))
    }

    pub fn contains(&self, address: &str) -> bool {
        normalize_address(address)
            .map(|a| self.addresses.contains(&a))
            .unwrap_or(false)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.addresses.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Reduce `http://host:port/path` to `host:port`; bare `host:port` passes through.
pub fn normalize_address(raw: &str) -> Result<String, LedgerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidPeer("empty address".into()));
    }
    if !trimmed.contains("://") {
        return Ok(trimmed.trim_end_matches('/').to_string());
    }

    let url = Url::parse(trimmed).map_err(|e| LedgerError::InvalidPeer(format!("{raw}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| LedgerError::InvalidPeer(format!("{raw}: no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_bare_addresses_normalize_alike() {
        assert_eq!(
            normalize_address("http://192.168.0.5:5000").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(
            normalize_address("http://192.168.0.5:5000/chain").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(
            normalize_address(" 192.168.0.5:5000/ ").unwrap(),
            "192.168.0.5:5000"
        );
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(normalize_address("   ").is_err());
        assert!(PeerRegistry::new().register("").is_err());
    }

    #[test]
    fn registry_deduplicates_and_sorts() {
        let mut peers = PeerRegistry::new();
        assert!(peers.register("node-b:5000").unwrap());
        assert!(peers.register("node-a:5000").unwrap());
        assert!(!peers.register("http://node-b:5000").unwrap());
        assert_eq!(peers.len(), 2);
        assert_eq!(peers.to_vec(), vec!["node-a:5000", "node-b:5000"]);
        assert!(peers.contains("http://node-a:5000/"));
    }
}
