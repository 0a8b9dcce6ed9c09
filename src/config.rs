//! Node configuration from command-line flags and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "session-ledger", version, about = "Session ledger node")]
pub struct NodeConfig {
    /// Address the HTTP API listens on
    #[arg(long, env = "LEDGER_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Directory holding blocks, peers and the node key
    #[arg(long, env = "LEDGER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Peer to register at startup (repeatable)
    #[arg(long = "peer", env = "LEDGER_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Per-request timeout when fetching a peer's chain
    #[arg(long, default_value_t = 5)]
    pub fetch_timeout_secs: u64,

    /// Give up a proof search after this many seconds
    #[arg(long, default_value_t = 60)]
    pub mine_timeout_secs: u64,

    /// Run consensus resolution in the background at this interval
    #[arg(long)]
    pub resolve_interval_secs: Option<u64>,
}

impl NodeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn mine_timeout(&self) -> Duration {
        Duration::from_secs(self.mine_timeout_secs)
    }

    pub fn resolve_interval(&self) -> Option<Duration> {
        self.resolve_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join("key.bin")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            data_dir: PathBuf::from("data"),
            peers: Vec::new(),
            fetch_timeout_secs: 5,
            mine_timeout_secs: 60,
            resolve_interval_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let cfg = NodeConfig::try_parse_from([
            "session-ledger",
            "--bind",
            "0.0.0.0:6000",
            "--peer",
            "a:5000",
            "--peer",
            "b:5000,c:5000",
            "--resolve-interval-secs",
            "30",
        ])
        .unwrap();
        assert_eq!(cfg.bind.port(), 6000);
        assert_eq!(cfg.peers, vec!["a:5000", "b:5000", "c:5000"]);
        assert_eq!(cfg.resolve_interval(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.mine_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn defaults_match_parser_defaults() {
        let parsed = NodeConfig::try_parse_from(["session-ledger"]).unwrap();
        let default = NodeConfig::default();
        assert_eq!(parsed.bind, default.bind);
        assert_eq!(parsed.data_dir, default.data_dir);
        assert_eq!(parsed.fetch_timeout_secs, default.fetch_timeout_secs);
        assert_eq!(default.resolve_interval(), None);
    }
}
