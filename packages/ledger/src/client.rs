use async_trait::async_trait;
use common::{LedgerEntry, RecordId, Severity};

use crate::error::LedgerError;

/// Fields committed to the ledger for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerRecord {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// CID of the pinned detail document.
    pub blob_hash: String,
}

/// Proof that a create transaction was mined successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// Client bound to the record registry contract.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a create transaction and wait until it is confirmed.
    async fn create_record(&self, record: &NewLedgerRecord) -> Result<CommitReceipt, LedgerError>;

    /// Every record, in ledger order.
    async fn get_all_records(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// A single record, or `None` if the ledger has no such id.
    async fn get_record(&self, id: RecordId) -> Result<Option<LedgerEntry>, LedgerError>;
}
