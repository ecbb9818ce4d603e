use async_trait::async_trait;
use serde_json::Value;

use super::content_id::BlobCid;
use super::error::StorageError;

/// Content-addressed storage for JSON detail documents.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Pin a JSON document and return its content identifier.
    ///
    /// Pinning identical content yields the same identifier, so repeating
    /// this call is safe.
    async fn pin_json(&self, document: &Value) -> Result<BlobCid, StorageError>;

    /// Fetch a previously pinned JSON document.
    async fn fetch_json(&self, cid: &BlobCid) -> Result<Value, StorageError>;
}
