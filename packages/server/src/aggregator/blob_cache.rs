use std::num::NonZeroUsize;
use std::sync::Arc;

use common::storage::BlobCid;
use lru::LruCache;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// Detail documents keyed by CID.
///
/// Content addressing makes every entry immutable, so nothing is ever
/// invalidated; entries only leave by eviction.
pub struct BlobCache {
    entries: Mutex<LruCache<BlobCid, Arc<Map<String, Value>>>>,
}

impl BlobCache {
    /// `None` when `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|cap| Self {
            entries: Mutex::new(LruCache::new(cap)),
        })
    }

    pub async fn get(&self, cid: &BlobCid) -> Option<Arc<Map<String, Value>>> {
        self.entries.lock().await.get(cid).cloned()
    }

    pub async fn insert(&self, cid: BlobCid, details: Arc<Map<String, Value>>) {
        self.entries.lock().await.put(cid, details);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
