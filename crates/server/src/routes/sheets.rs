//! Spreadsheet access checks used while configuring a sync.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde::Deserialize;
use services::services::{google_sheets::SpreadsheetMetadata, sheet_sync::DEFAULT_SHEET_NAME};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct HeadersQuery {
    pub sheet_name: Option<String>,
}

/// Verify the service account can read the spreadsheet and list its tabs
pub async fn get_spreadsheet(
    State(state): State<AppState>,
    Path(spreadsheet_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<SpreadsheetMetadata>>, ApiError> {
    let metadata = state.sheets.spreadsheet_metadata(&spreadsheet_id).await?;
    Ok(ResponseJson(ApiResponse::success(metadata)))
}

/// Header row of one tab, for building a column mapping
pub async fn get_headers(
    State(state): State<AppState>,
    Path(spreadsheet_id): Path<String>,
    Query(query): Query<HeadersQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    let sheet_name = query
        .sheet_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
    let headers = state.sheets.fetch_headers(&spreadsheet_id, &sheet_name).await?;
    Ok(ResponseJson(ApiResponse::success(headers)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sheets/{spreadsheet_id}", get(get_spreadsheet))
        .route("/sheets/{spreadsheet_id}/headers", get(get_headers))
}
