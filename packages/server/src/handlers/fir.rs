use axum::Json;
use axum::extract::{Path, State};
use common::{RecordId, SearchCriterion, SearchField};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::fir::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/uploadFIR",
    tag = "FIRs",
    operation_id = "uploadFir",
    summary = "File a new FIR",
    description = "Resolves severity (client value if valid, otherwise the classifier, otherwise 1), pins the full body with the resolved severity, then commits title, description, severity and the pinned CID to the ledger and waits for confirmation.",
    request_body = SubmitRecordRequest,
    responses(
        (status = 200, description = "FIR committed", body = SubmitRecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Pinning or ledger commit failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn upload_fir(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitRecordRequest>,
) -> Result<Json<SubmitRecordResponse>, AppError> {
    let outcome = state.aggregator.submit(payload.0).await?;
    tracing::info!(
        record_id = ?outcome.record_id,
        tx_hash = %outcome.tx_hash,
        "FIR filed"
    );
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    get,
    path = "/getAllFIRs",
    tag = "FIRs",
    operation_id = "getAllFirs",
    summary = "List all FIRs",
    description = "Returns every FIR in ledger order, merged with its pinned details. FIRs whose details cannot be fetched are omitted.",
    responses(
        (status = 200, description = "FIRs", body = RecordListResponse),
        (status = 502, description = "Ledger failure (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_all_firs(
    State(state): State<AppState>,
) -> Result<Json<RecordListResponse>, AppError> {
    let data = state.aggregator.list().await?;
    Ok(Json(RecordListResponse {
        success: true,
        total: data.len(),
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/getFIR/{id}",
    tag = "FIRs",
    operation_id = "getFir",
    summary = "Get a FIR by ledger id",
    params(("id" = u64, Path, description = "Ledger id")),
    responses(
        (status = 200, description = "FIR details", body = RecordResponse),
        (status = 400, description = "Id is not a number (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No such FIR (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Details unavailable (PARTIAL_RECORD) or ledger failure (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_fir(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecordResponse>, AppError> {
    let id: RecordId = id
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("FIR id must be a non-negative integer, got '{id}'")))?;

    let data = state.aggregator.get(id).await?;
    Ok(Json(RecordResponse {
        success: true,
        data,
    }))
}

#[utoipa::path(
    post,
    path = "/searchFIR",
    tag = "FIRs",
    operation_id = "searchFir",
    summary = "Find the first FIR matching a field",
    description = "`fir` matches the FIR number (substring) or the exact ledger id; `phone` compares digits only; `email` and `id` (government id number) are case-insensitive substrings. Returns `data: null` when nothing matches.",
    request_body = SearchRecordRequest,
    responses(
        (status = 200, description = "First match or null", body = SearchRecordResponse),
        (status = 400, description = "Unknown search type or empty value (VALIDATION_ERROR)", body = ErrorBody),
        (status = 502, description = "Ledger failure (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(search_type = %payload.search_type))]
pub async fn search_fir(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SearchRecordRequest>,
) -> Result<Json<SearchRecordResponse>, AppError> {
    let field: SearchField = payload.search_type.trim().parse()?;
    let criterion = SearchCriterion::new(field, &payload.search_value)?;

    let data = state.aggregator.search(&criterion).await?;
    Ok(Json(SearchRecordResponse {
        success: true,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/getStatistics",
    tag = "FIRs",
    operation_id = "getStatistics",
    summary = "Count FIRs by status",
    responses(
        (status = 200, description = "Counts", body = StatisticsResponse),
        (status = 502, description = "Ledger failure (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, AppError> {
    let data = state.aggregator.statistics().await?;
    Ok(Json(StatisticsResponse {
        success: true,
        data,
    }))
}
