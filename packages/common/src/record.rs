use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::severity::RecordStatus;

/// Ledger-assigned sequential identifier.
pub type RecordId = u64;

pub const TIMELINE_DESCRIPTION: &str = "FIR registered and stored on blockchain";
pub const TIMELINE_OFFICER: &str = "System Administrator";

/// One row of the ledger, decoded into its canonical shape.
///
/// Ledger clients convert whatever their wire representation is into this
/// struct at the boundary; nothing downstream indexes ledger data positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    /// Raw severity level as stored on chain.
    pub severity: u64,
    /// Content identifier of the pinned detail document.
    pub blob_hash: String,
    /// Block timestamp. Not every ledger view carries it.
    pub created_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn status(&self) -> RecordStatus {
        RecordStatus::for_level(self.severity)
    }
}

/// Single synthesized history entry shown alongside a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub status: RecordStatus,
    pub description: String,
    pub officer: String,
}

/// Human-readable record number, e.g. `FIR2024000042`.
pub fn record_number(id: RecordId, year: i32) -> String {
    format!("FIR{year}{id:06}")
}

/// A complete record: ledger entry merged with its pinned details.
///
/// Derived fields (`record_number`, `status`, `timeline`) are computed when
/// the record is assembled and never stored anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub entry: LedgerEntry,
    pub details: Map<String, Value>,
    pub record_number: String,
    pub status: RecordStatus,
    pub filed_date: NaiveDate,
    pub last_updated: NaiveDate,
    pub timeline: Vec<TimelineEntry>,
}

impl Record {
    /// Merge a ledger entry with its blob document as observed at `now`.
    pub fn assemble(entry: LedgerEntry, details: Map<String, Value>, now: DateTime<Utc>) -> Self {
        let filed = entry.created_at.unwrap_or(now);
        let status = entry.status();
        let filed_date = filed.date_naive();

        Self {
            record_number: record_number(entry.id, filed.year()),
            status,
            filed_date,
            last_updated: now.date_naive(),
            timeline: vec![TimelineEntry {
                date: filed_date,
                status,
                description: TIMELINE_DESCRIPTION.to_string(),
                officer: TIMELINE_OFFICER.to_string(),
            }],
            entry,
            details,
        }
    }

    pub fn id(&self) -> RecordId {
        self.entry.id
    }

    /// String-valued blob field, if present.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }

    /// Flatten into the wire shape.
    ///
    /// Ledger content goes in first, blob fields override it, and identity
    /// plus derived fields are written last so a blob cannot spoof them.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let filed = Value::String(self.filed_date.to_string());

        map.insert("title".into(), Value::String(self.entry.title.clone()));
        map.insert(
            "description".into(),
            Value::String(self.entry.description.clone()),
        );
        map.insert(
            "severity".into(),
            Value::String(self.entry.severity.to_string()),
        );
        map.insert("timestamp".into(), filed.clone());
        map.insert("filedDate".into(), filed);
        map.insert(
            "lastUpdated".into(),
            Value::String(self.last_updated.to_string()),
        );

        for (key, value) in &self.details {
            map.insert(key.clone(), value.clone());
        }

        map.insert("id".into(), Value::String(self.entry.id.to_string()));
        map.insert("blockchainId".into(), Value::from(self.entry.id));
        map.insert(
            "firNumber".into(),
            Value::String(self.record_number.clone()),
        );
        map.insert(
            "ipfsHash".into(),
            Value::String(self.entry.blob_hash.clone()),
        );
        map.insert(
            "status".into(),
            Value::String(self.status.as_str().to_string()),
        );
        map.insert(
            "timeline".into(),
            serde_json::to_value(&self.timeline).unwrap_or(Value::Array(Vec::new())),
        );

        map
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}
