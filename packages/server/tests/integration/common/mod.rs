use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cid::Cid;
use common::retry::RetryPolicy;
use common::storage::{BlobCid, BlobStore, StorageError};
use common::{LedgerEntry, RecordId, Severity};
use ledger::{CommitReceipt, LedgerClient, LedgerError, NewLedgerRecord};
use multihash_codetable::{Code, MultihashDigest};
use reqwest::Client;
use serde_json::Value;

use server::aggregator::{Aggregator, AggregatorSettings};
use server::classifier::{ClassifyError, SeverityClassifier};
use server::config::{
    AggregatorConfig, AppConfig, BlobStoreConfig, ClassifierConfig, CorsConfig, LedgerConfig,
    ServerConfig,
};
use server::state::AppState;

pub mod routes {
    pub const UPLOAD: &str = "/api/uploadFIR";
    pub const ALL: &str = "/api/getAllFIRs";
    pub const SEARCH: &str = "/api/searchFIR";
    pub const STATISTICS: &str = "/api/getStatistics";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn fir(id: impl std::fmt::Display) -> String {
        format!("/api/getFIR/{id}")
    }
}

/// Block timestamp stamped on every fake ledger entry.
pub fn block_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

/// In-memory registry contract.
#[derive(Default)]
pub struct FakeLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    pub fail_commits: AtomicBool,
}

impl FakeLedger {
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn append(&self, title: &str, description: &str, severity: u64, blob_hash: String) -> RecordId {
        let mut entries = self.entries.lock().unwrap();
        let id = entries.len() as RecordId + 1;
        entries.push(LedgerEntry {
            id,
            title: title.to_string(),
            description: description.to_string(),
            severity,
            blob_hash,
            created_at: Some(block_time()),
        });
        id
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn create_record(&self, record: &NewLedgerRecord) -> Result<CommitReceipt, LedgerError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "insufficient funds for gas".into(),
            });
        }
        let id = self.append(
            &record.title,
            &record.description,
            record.severity.level().into(),
            record.blob_hash.clone(),
        );
        Ok(CommitReceipt {
            tx_hash: format!("0x{id:064x}"),
            block_number: Some(id),
        })
    }

    async fn get_all_records(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.entries())
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.entries().into_iter().find(|e| e.id == id))
    }
}

/// In-memory pinning service that derives real CIDv0s from the content.
#[derive(Default)]
pub struct FakeBlobStore {
    documents: Mutex<HashMap<BlobCid, Value>>,
    unavailable: Mutex<HashSet<BlobCid>>,
    pub fetches: AtomicUsize,
    pub fail_pins: AtomicBool,
}

impl FakeBlobStore {
    pub fn document(&self, cid: &str) -> Option<Value> {
        let cid = BlobCid::parse(cid).ok()?;
        self.documents.lock().unwrap().get(&cid).cloned()
    }

    pub fn pinned_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Make the gateway fail for `cid` from now on.
    pub fn make_unavailable(&self, cid: &str) {
        let cid = BlobCid::parse(cid).unwrap();
        self.unavailable.lock().unwrap().insert(cid);
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn pin_json(&self, document: &Value) -> Result<BlobCid, StorageError> {
        if self.fail_pins.load(Ordering::SeqCst) {
            return Err(StorageError::Upstream {
                status: 503,
                body: "pinning service unavailable".into(),
            });
        }
        let bytes = serde_json::to_vec(document).map_err(|e| StorageError::Decode(e.to_string()))?;
        let cid = BlobCid::from(Cid::new_v0(Code::Sha2_256.digest(&bytes)).unwrap());
        self.documents.lock().unwrap().insert(cid, document.clone());
        Ok(cid)
    }

    async fn fetch_json(&self, cid: &BlobCid) -> Result<Value, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.lock().unwrap().contains(cid) {
            return Err(StorageError::Upstream {
                status: 504,
                body: "gateway timeout".into(),
            });
        }
        self.documents
            .lock()
            .unwrap()
            .get(cid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(cid.to_string()))
    }
}

/// Classifier that answers with a fixed severity, or fails when `None`.
pub struct FakeClassifier {
    answer: Option<Severity>,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn answering(answer: Option<Severity>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SeverityClassifier for FakeClassifier {
    async fn classify(&self, _description: &str) -> Result<Severity, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .ok_or_else(|| ClassifyError::Transport("connection refused".into()))
    }
}

/// Options for [`TestApp::spawn_with`].
#[derive(Default)]
pub struct TestOptions {
    pub classifier: Option<Arc<FakeClassifier>>,
    /// 0 keeps the blob cache off so every read hits the store.
    pub cache_capacity: usize,
    /// Blob fetches in flight per request. Defaults to 4.
    pub max_concurrent_fetches: Option<usize>,
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub ledger: Arc<FakeLedger>,
    pub blobs: Arc<FakeBlobStore>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        blob_store: BlobStoreConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            gateway_url: "http://127.0.0.1:9".to_string(),
            api_key: "unused".to_string(),
            secret_api_key: "unused".to_string(),
            timeout_secs: 1,
        },
        ledger: LedgerConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            contract_address: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
            private_key: "46".repeat(32),
            chain_id: Some(31337),
            rpc_timeout_secs: 1,
            confirmation_timeout_secs: 1,
            poll_interval_ms: 10,
            gas_limit_percent: 120,
        },
        classifier: ClassifierConfig {
            url: None,
            timeout_secs: 1,
        },
        aggregator: AggregatorConfig {
            max_concurrent_fetches: 4,
            cache_capacity: 0,
        },
        retry: RetryPolicy {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        let ledger = Arc::new(FakeLedger::default());
        let blobs = Arc::new(FakeBlobStore::default());

        let mut config = test_config();
        config.aggregator.cache_capacity = options.cache_capacity;
        if let Some(limit) = options.max_concurrent_fetches {
            config.aggregator.max_concurrent_fetches = limit;
        }

        let classifier = options
            .classifier
            .map(|c| c as Arc<dyn SeverityClassifier>);
        let aggregator = Aggregator::new(
            ledger.clone(),
            blobs.clone(),
            classifier,
            AggregatorSettings {
                max_concurrent_fetches: config.aggregator.max_concurrent_fetches,
                cache_capacity: config.aggregator.cache_capacity,
                retry: config.retry,
            },
        );

        let state = AppState {
            aggregator: Arc::new(aggregator),
            config,
        };
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            ledger,
            blobs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// Put a record straight onto the fake ledger, bypassing the API.
    pub async fn seed(&self, title: &str, severity: u64, details: Value) -> RecordId {
        let cid = self.blobs.pin_json(&details).await.unwrap();
        self.ledger
            .append(title, "seeded record", severity, cid.to_string())
    }

    /// Blob hash the ledger holds for `id`.
    pub fn blob_hash(&self, id: RecordId) -> String {
        self.ledger
            .entries()
            .into_iter()
            .find(|e| e.id == id)
            .map(|e| e.blob_hash)
            .expect("record exists")
    }
}
