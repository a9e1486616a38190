//! Manual sync, disable, and on-demand scheduled runs.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use services::services::{
    sheet_import::SyncResult,
    sheet_sync::{EntitySyncOutcome, ManualSyncRequest},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Configure the property's task sheet and import it now
pub async fn sync_property_tasks(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
    Json(request): Json<ManualSyncRequest>,
) -> Result<ResponseJson<ApiResponse<SyncResult>>, ApiError> {
    let result = state.sync.sync_property_tasks(property_id, &request).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn disable_property_sync(
    State(state): State<AppState>,
    Path(property_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.sync.disable_property_sync(property_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Configure the company's property sheet and import it now
pub async fn sync_company_properties(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<ManualSyncRequest>,
) -> Result<ResponseJson<ApiResponse<SyncResult>>, ApiError> {
    let result = state.sync.sync_company_properties(company_id, &request).await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub async fn disable_company_sync(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.sync.disable_company_sync(company_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Same pass the background scheduler runs; for external cron triggers
pub async fn run_scheduled_sync(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<EntitySyncOutcome>>>, ApiError> {
    let outcomes = state.sync.run_scheduled().await?;
    Ok(ResponseJson(ApiResponse::success(outcomes)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/properties/{property_id}/sheet-sync",
            post(sync_property_tasks).delete(disable_property_sync),
        )
        .route(
            "/companies/{company_id}/sheet-sync",
            post(sync_company_properties).delete(disable_company_sync),
        )
        .route("/sheet-sync/run", post(run_scheduled_sync))
}
