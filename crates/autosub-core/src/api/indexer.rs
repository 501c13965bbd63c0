//! Downstream indexer notified once a deployment lands on-chain.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use url::Url;

use super::client::{USER_AGENT, with_trailing_slash};
use crate::error::{DeployError, RemoteCall, Result};
use crate::types::{B256, ChainId};

#[async_trait]
pub trait IndexerTrigger: Send + Sync {
    /// Ask the indexer to process the deployment transaction.
    async fn trigger(&self, tx_hash: B256, chain_id: ChainId) -> Result<()>;
}

/// `POST {base}/vendor/indexer/process/{tx}/{chain}` with an `x-api-key` header.
#[derive(Debug, Clone)]
pub struct HttpIndexer {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpIndexer {
    pub fn new(base_url: Url, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build indexer HTTP client")?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            api_key,
        })
    }

    fn process_url(&self, tx_hash: B256, chain_id: ChainId) -> Result<Url> {
        let route = format!("vendor/indexer/process/{tx_hash}/{chain_id}");
        self.base_url
            .join(&route)
            .map_err(|e| DeployError::remote(RemoteCall::IndexerTrigger, e.to_string()))
    }
}

#[async_trait]
impl IndexerTrigger for HttpIndexer {
    async fn trigger(&self, tx_hash: B256, chain_id: ChainId) -> Result<()> {
        let call = RemoteCall::IndexerTrigger;
        let url = self.process_url(tx_hash, chain_id)?;
        tracing::debug!(%url, "triggering indexer");

        let mut request = self.client.post(url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeployError::remote(call, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeployError::RemoteCallFailure {
                call,
                status: Some(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }
        Ok(())
    }
}
