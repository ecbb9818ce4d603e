use common::RecordId;
use common::storage::StorageError;
use ledger::LedgerError;
use thiserror::Error;

use super::submission::InvalidSubmission;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    InvalidSubmission(#[from] InvalidSubmission),

    #[error("FIR {0} not found")]
    NotFound(RecordId),

    #[error("FIR {id} exists on the ledger but its details could not be fetched: {source}")]
    PartialRecord {
        id: RecordId,
        #[source]
        source: StorageError,
    },

    #[error("failed to pin FIR details: {0}")]
    Pin(#[source] StorageError),

    #[error("failed to commit FIR to the ledger: {0}")]
    Commit(#[source] LedgerError),

    #[error("failed to read the ledger: {0}")]
    Ledger(#[from] LedgerError),
}
