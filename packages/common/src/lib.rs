pub mod record;
pub mod retry;
pub mod search;
pub mod severity;
pub mod storage;

pub use record::{LedgerEntry, Record, RecordId, TimelineEntry};
pub use search::{InvalidCriterion, SearchCriterion, SearchField};
pub use severity::{RecordStatus, Severity};
