//! Record aggregation: the write path (classify, pin, commit) and the read
//! paths that merge ledger entries with their pinned details.

pub mod blob_cache;
mod error;
mod submission;

use std::pin::pin;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use common::record::record_number;
use common::retry::{RetryPolicy, retry};
use common::storage::{BlobCid, BlobStore, StorageError};
use common::{LedgerEntry, Record, RecordId, RecordStatus, SearchCriterion, Severity};
use futures::{StreamExt, future, stream};
use ledger::{LedgerClient, NewLedgerRecord};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::classifier::SeverityClassifier;

pub use blob_cache::BlobCache;
pub use error::AggregateError;
pub use submission::{DEFAULT_TITLE, InvalidSubmission, Submission};

#[derive(Debug, Clone, Copy)]
pub struct AggregatorSettings {
    pub max_concurrent_fetches: usize,
    /// 0 disables the blob cache.
    pub cache_capacity: usize,
    pub retry: RetryPolicy,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Ledger id, when the committed entry could be read back.
    pub record_id: Option<RecordId>,
    pub record_number: Option<String>,
    pub blob_cid: BlobCid,
    pub tx_hash: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordStatistics {
    pub total: usize,
    pub registered: usize,
    pub under_investigation: usize,
}

pub struct Aggregator {
    ledger: Arc<dyn LedgerClient>,
    blobs: Arc<dyn BlobStore>,
    classifier: Option<Arc<dyn SeverityClassifier>>,
    cache: Option<BlobCache>,
    max_concurrent_fetches: usize,
    retry: RetryPolicy,
}

impl Aggregator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        blobs: Arc<dyn BlobStore>,
        classifier: Option<Arc<dyn SeverityClassifier>>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            ledger,
            blobs,
            classifier,
            cache: BlobCache::new(settings.cache_capacity),
            max_concurrent_fetches: settings.max_concurrent_fetches.max(1),
            retry: settings.retry,
        }
    }

    /// Classify, pin and commit a new record.
    pub async fn submit(&self, body: Value) -> Result<SubmitOutcome, AggregateError> {
        let submission = Submission::parse(body)?;
        let severity = self.resolve_severity(&submission).await;

        let document = submission.document(severity);
        let cid = retry(&self.retry, "blob_pin", || self.blobs.pin_json(&document))
            .await
            .map_err(AggregateError::Pin)?;
        info!(cid = %cid, severity = %severity, "Pinned FIR details");

        let new_record = NewLedgerRecord {
            title: submission.title().to_string(),
            description: submission.description().to_string(),
            severity,
            blob_hash: cid.to_string(),
        };
        let receipt = self.ledger.create_record(&new_record).await.map_err(|e| {
            warn!(cid = %cid, error = %e, "Ledger commit failed; pinned details are orphaned");
            AggregateError::Commit(e)
        })?;

        let committed = self.find_committed(&new_record.blob_hash).await;
        let now = Utc::now();
        Ok(SubmitOutcome {
            record_id: committed.as_ref().map(|entry| entry.id),
            record_number: committed.as_ref().map(|entry| {
                record_number(entry.id, entry.created_at.unwrap_or(now).year())
            }),
            blob_cid: cid,
            tx_hash: receipt.tx_hash,
            severity,
        })
    }

    /// Every record whose details could be fetched, in ledger order.
    pub async fn list(&self) -> Result<Vec<Record>, AggregateError> {
        let entries = self.ledger.get_all_records().await?;
        let total = entries.len();
        let records: Vec<Record> = self
            .records(entries, Utc::now())
            .filter_map(future::ready)
            .collect()
            .await;

        if records.len() < total {
            warn!(
                total,
                returned = records.len(),
                "Some FIRs were skipped because their details were unavailable"
            );
        }
        Ok(records)
    }

    /// One complete record. Never returns ledger-only data.
    pub async fn get(&self, id: RecordId) -> Result<Record, AggregateError> {
        let entry = self
            .ledger
            .get_record(id)
            .await?
            .ok_or(AggregateError::NotFound(id))?;

        let details = self
            .fetch_details(&entry.blob_hash)
            .await
            .map_err(|source| AggregateError::PartialRecord { id, source })?;

        Ok(Record::assemble(entry, details, Utc::now()))
    }

    /// First record in ledger order that matches `criterion`.
    ///
    /// Fetches stay pipelined; whatever is still in flight when a match is
    /// found gets dropped.
    pub async fn search(
        &self,
        criterion: &SearchCriterion,
    ) -> Result<Option<Record>, AggregateError> {
        let entries = self.ledger.get_all_records().await?;
        let mut records = pin!(self.records(entries, Utc::now()).filter_map(future::ready));

        while let Some(record) = records.next().await {
            if criterion.matches(&record) {
                debug!(id = record.id(), field = %criterion.field(), "Search matched");
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    pub async fn statistics(&self) -> Result<RecordStatistics, AggregateError> {
        let records = self.list().await?;
        let under_investigation = records
            .iter()
            .filter(|r| r.status == RecordStatus::UnderInvestigation)
            .count();
        Ok(RecordStatistics {
            total: records.len(),
            registered: records.len() - under_investigation,
            under_investigation,
        })
    }

    async fn resolve_severity(&self, submission: &Submission) -> Severity {
        if let Some(severity) = submission.requested_severity() {
            return severity;
        }
        let Some(classifier) = &self.classifier else {
            debug!("No classifier configured, defaulting severity to low");
            return Severity::default();
        };

        match classifier.classify(submission.description()).await {
            Ok(severity) => {
                debug!(severity = %severity, "Classifier assigned severity");
                severity
            }
            Err(e) => {
                warn!(error = %e, "Severity classification failed, defaulting to low");
                Severity::default()
            }
        }
    }

    /// Highest ledger id pointing at `blob_hash`.
    ///
    /// Identical bodies pin to the same CID, so two of them committed
    /// back to back can both resolve to the later id. The tx hash stays unique.
    async fn find_committed(&self, blob_hash: &str) -> Option<LedgerEntry> {
        match self.ledger.get_all_records().await {
            Ok(entries) => {
                let found = entries
                    .into_iter()
                    .filter(|entry| entry.blob_hash == blob_hash)
                    .max_by_key(|entry| entry.id);
                if found.is_none() {
                    warn!(cid = blob_hash, "Committed FIR not visible on the ledger yet");
                }
                found
            }
            Err(e) => {
                warn!(cid = blob_hash, error = %e, "Could not read back committed FIR");
                None
            }
        }
    }

    /// Assemble records with bounded concurrency, yielding in ledger order.
    /// Entries whose details cannot be fetched yield `None`.
    fn records(
        &self,
        entries: Vec<LedgerEntry>,
        now: DateTime<Utc>,
    ) -> impl futures::Stream<Item = Option<Record>> + '_ {
        stream::iter(entries)
            .map(move |entry| self.assemble(entry, now))
            .buffered(self.max_concurrent_fetches)
    }

    async fn assemble(&self, entry: LedgerEntry, now: DateTime<Utc>) -> Option<Record> {
        match self.fetch_details(&entry.blob_hash).await {
            Ok(details) => Some(Record::assemble(entry, details, now)),
            Err(e) => {
                warn!(
                    id = entry.id,
                    cid = %entry.blob_hash,
                    error = %e,
                    "Skipping FIR with unavailable details"
                );
                None
            }
        }
    }

    async fn fetch_details(&self, blob_hash: &str) -> Result<Map<String, Value>, StorageError> {
        let cid = BlobCid::parse(blob_hash)?;

        if let Some(cache) = &self.cache
            && let Some(details) = cache.get(&cid).await
        {
            return Ok(details.as_ref().clone());
        }

        let document = retry(&self.retry, "blob_fetch", || self.blobs.fetch_json(&cid)).await?;
        let Value::Object(details) = document else {
            return Err(StorageError::Decode(format!(
                "details for {cid} are not a JSON object"
            )));
        };

        if let Some(cache) = &self.cache {
            cache.insert(cid, Arc::new(details.clone())).await;
        }
        Ok(details)
    }
}
