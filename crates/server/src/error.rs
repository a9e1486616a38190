use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    google_sheets::SheetsError, sheet_import::ImportError, sheet_sync::SheetSyncError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    SheetSync(#[from] SheetSyncError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SheetSync(err) => match err {
                SheetSyncError::Import(err) => import_status(err),
                SheetSyncError::PropertyNotFound(_) | SheetSyncError::CompanyNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                SheetSyncError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Import(err) => import_status(err),
            ApiError::Sheets(err) => sheets_status(err),
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn import_status(err: &ImportError) -> StatusCode {
    match err {
        ImportError::Sheets(err) => sheets_status(err),
        ImportError::PropertyNotFound(_) | ImportError::CompanyNotFound(_) => StatusCode::NOT_FOUND,
        ImportError::InvalidMapping(_) | ImportError::NoDataRows { .. } => StatusCode::BAD_REQUEST,
        ImportError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn sheets_status(err: &SheetsError) -> StatusCode {
    match err {
        SheetsError::Configuration(_) | SheetsError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SheetsError::Permission { .. } => StatusCode::FORBIDDEN,
        SheetsError::EmptyData { .. } => StatusCode::BAD_REQUEST,
        SheetsError::Transport(_) | SheetsError::Http { .. } | SheetsError::Serde(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            error!(status = %status_code, error = %self, "Request failed");
        }
        let response = ApiResponse::<()>::error(&self.to_string());
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let permission = ApiError::from(SheetsError::Permission {
            spreadsheet_id: "s".into(),
            service_account: "sa@x".into(),
        });
        assert_eq!(permission.status_code(), StatusCode::FORBIDDEN);

        let config = ApiError::from(ImportError::Sheets(SheetsError::Configuration("x".into())));
        assert_eq!(config.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let empty = ApiError::from(SheetSyncError::Import(ImportError::Sheets(
            SheetsError::EmptyData {
                sheet_name: "Tasks".into(),
            },
        )));
        assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);

        let mapping = ApiError::from(ImportError::InvalidMapping("empty".into()));
        assert_eq!(mapping.status_code(), StatusCode::BAD_REQUEST);

        let missing = ApiError::from(SheetSyncError::PropertyNotFound(Uuid::new_v4()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let db = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(db.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
