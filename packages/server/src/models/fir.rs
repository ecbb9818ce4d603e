use common::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregator::{RecordStatistics, SubmitOutcome};

pub const SUBMIT_MESSAGE: &str = "FIR successfully uploaded and saved on blockchain";

/// Free-form FIR submission.
///
/// `incidentType` (or `title`), `incidentDescription` (or `description`) and
/// `severity` are interpreted; every other key is pinned verbatim with the
/// record details.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct SubmitRecordRequest(pub Value);

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRecordResponse {
    pub success: bool,
    #[schema(example = "FIR successfully uploaded and saved on blockchain")]
    pub message: String,
    /// Ledger id, `null` if the commit could not be read back yet.
    #[schema(example = 42)]
    pub record_id: Option<u64>,
    #[schema(example = "FIR2024000042")]
    pub fir_number: Option<String>,
    #[schema(example = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG")]
    pub ipfs_hash: String,
    pub tx_hash: String,
    /// Resolved severity level (1-3).
    #[schema(example = 3)]
    pub severity: u8,
}

impl From<SubmitOutcome> for SubmitRecordResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        Self {
            success: true,
            message: SUBMIT_MESSAGE.to_string(),
            record_id: outcome.record_id,
            fir_number: outcome.record_number,
            ipfs_hash: outcome.blob_cid.to_string(),
            tx_hash: outcome.tx_hash,
            severity: outcome.severity.level(),
        }
    }
}

/// Merged records in ledger order.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordListResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Record>,
    pub total: usize,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub data: Record,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecordRequest {
    /// One of `fir`, `phone`, `email`, `id`.
    #[schema(example = "phone")]
    pub search_type: String,
    #[schema(example = "9876543210")]
    pub search_value: String,
}

/// First match in ledger order, or `null`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SearchRecordResponse {
    pub success: bool,
    #[schema(value_type = Option<Object>)]
    pub data: Option<Record>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StatisticsResponse {
    pub success: bool,
    pub data: RecordStatistics,
}
