use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::content_id::BlobCid;
use super::error::StorageError;
use super::traits::BlobStore;

/// Connection settings for the Pinata pinning API and its IPFS gateway.
#[derive(Debug, Clone)]
pub struct PinataSettings {
    /// Pinning API base, e.g. `https://api.pinata.cloud`.
    pub api_url: String,
    /// Gateway base, e.g. `https://gateway.pinata.cloud`.
    pub gateway_url: String,
    pub api_key: String,
    pub secret_api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Blob store backed by Pinata.
pub struct PinataBlobStore {
    client: Client,
    pin_url: String,
    gateway_url: String,
    api_key: String,
    secret_api_key: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataBlobStore {
    pub fn new(settings: PinataSettings) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("fir-ledger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            pin_url: format!(
                "{}/pinning/pinJSONToIPFS",
                settings.api_url.trim_end_matches('/')
            ),
            gateway_url: settings.gateway_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            secret_api_key: settings.secret_api_key,
        })
    }

    fn gateway_path(&self, cid: &BlobCid) -> String {
        format!("{}/ipfs/{}", self.gateway_url, cid)
    }
}

fn transport(err: reqwest::Error) -> StorageError {
    StorageError::Transport(err.to_string())
}

async fn upstream(response: Response) -> StorageError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StorageError::Upstream { status, body }
}

#[async_trait]
impl BlobStore for PinataBlobStore {
    async fn pin_json(&self, document: &Value) -> Result<BlobCid, StorageError> {
        let response = self
            .client
            .post(&self.pin_url)
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_api_key)
            .json(&json!({ "pinataContent": document }))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(upstream(response).await);
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Decode(e.to_string()))?;

        debug!(cid = %pinned.ipfs_hash, "Pinned JSON document");
        BlobCid::parse(&pinned.ipfs_hash)
    }

    async fn fetch_json(&self, cid: &BlobCid) -> Result<Value, StorageError> {
        let response = self
            .client
            .get(self.gateway_path(cid))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(cid.to_string())),
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| StorageError::Decode(format!("{cid}: {e}"))),
            _ => Err(upstream(response).await),
        }
    }
}
