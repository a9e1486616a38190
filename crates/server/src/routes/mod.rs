use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod sheet_sync;
pub mod sheets;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(sheets::router())
        .merge(sheet_sync::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use db::{
        DBService,
        models::{company::Company, property::{CreateProperty, Property}},
    };
    use serde_json::{Value, json};
    use services::services::{
        google_sheets::{SheetSource, SheetsError, SpreadsheetMetadata},
        notification::NotificationService,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    struct StaticSheet {
        rows: Vec<Vec<String>>,
        denied: bool,
    }

    impl StaticSheet {
        fn denied(&self, spreadsheet_id: &str) -> Result<(), SheetsError> {
            if self.denied {
                return Err(SheetsError::Permission {
                    spreadsheet_id: spreadsheet_id.to_string(),
                    service_account: "importer@demo.iam.gserviceaccount.com".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl SheetSource for StaticSheet {
        async fn spreadsheet_metadata(
            &self,
            spreadsheet_id: &str,
        ) -> Result<SpreadsheetMetadata, SheetsError> {
            self.denied(spreadsheet_id)?;
            Ok(SpreadsheetMetadata {
                spreadsheet_id: spreadsheet_id.to_string(),
                title: "Cleaning rota".to_string(),
                sheets: Vec::new(),
            })
        }

        async fn fetch_headers(
            &self,
            spreadsheet_id: &str,
            _sheet_name: &str,
        ) -> Result<Vec<String>, SheetsError> {
            self.denied(spreadsheet_id)?;
            Ok(self.rows.first().cloned().unwrap_or_default())
        }

        async fn fetch_rows(
            &self,
            spreadsheet_id: &str,
            _sheet_name: &str,
        ) -> Result<Vec<Vec<String>>, SheetsError> {
            self.denied(spreadsheet_id)?;
            Ok(self.rows.clone())
        }
    }

    async fn app(denied: bool) -> (Router, DBService) {
        let db = DBService::new_in_memory().await.unwrap();
        let sheet = StaticSheet {
            rows: vec![
                vec!["Task Name".into(), "Date".into(), "Unique ID".into()],
                vec!["Clean Unit 4".into(), "15/03/2024".into(), "U-100".into()],
            ],
            denied,
        };
        let state = AppState::new(
            db.clone(),
            Arc::new(sheet),
            Arc::new(NotificationService::new(db.clone())),
        );
        (router(state), db)
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn sync_body() -> Value {
        json!({
            "spreadsheet_id": "abc",
            "sheet_name": "Tasks",
            "column_mapping": {"Task Name": "title", "Date": "scheduledDate"},
            "unique_column": "Unique ID"
        })
    }

    #[tokio::test]
    async fn test_headers_route() {
        let (app, _db) = app(false).await;
        let (status, body) = send(app, Method::GET, "/api/sheets/abc/headers?sheet_name=Tasks", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!(["Task Name", "Date", "Unique ID"]));
    }

    #[tokio::test]
    async fn test_permission_error_is_forbidden() {
        let (app, _db) = app(true).await;
        let (status, body) = send(app, Method::GET, "/api/sheets/abc", None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("importer@demo.iam.gserviceaccount.com"));
    }

    #[tokio::test]
    async fn test_manual_property_sync() {
        let (app, db) = app(false).await;
        let company = Company::create(&db.pool, Uuid::new_v4(), "Acme").await.unwrap();
        let property = Property::create(
            &db.pool,
            &CreateProperty::from_address(company.id, "1 High St"),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let uri = format!("/api/properties/{}/sheet-sync", property.id);
        let (status, body) = send(app.clone(), Method::POST, &uri, Some(sync_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["created"], 1);
        assert_eq!(body["data"]["errors"], 0);

        let (status, _) = send(app.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app, Method::POST, "/api/sheet-sync/run", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_property_is_not_found() {
        let (app, _db) = app(false).await;
        let uri = format!("/api/properties/{}/sheet-sync", Uuid::new_v4());

        let (status, body) = send(app, Method::POST, &uri, Some(sync_body())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
