//! HTTP client for fetching peer chains.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::consensus::{ChainFetcher, ChainResponse};
use crate::error::PeerError;

#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, address: &str) -> Result<ChainResponse, PeerError> {
        let url = format!("http://{address}/chain");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerError::Unreachable {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(PeerError::Malformed {
                address: address.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }

        resp.json().await.map_err(|e| PeerError::Malformed {
            address: address.to_string(),
            reason: e.to_string(),
        })
    }
}
