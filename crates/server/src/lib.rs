pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use db::DBService;
use services::services::{
    google_sheets::SheetSource, notification::Notifier, sheet_sync::SheetSyncService,
};

/// Shared handles for every route
#[derive(Clone)]
pub struct AppState {
    pub sheets: Arc<dyn SheetSource>,
    pub sync: Arc<SheetSyncService>,
}

impl AppState {
    pub fn new(db: DBService, sheets: Arc<dyn SheetSource>, notifier: Arc<dyn Notifier>) -> Self {
        let sync = Arc::new(SheetSyncService::new(db, sheets.clone(), notifier));
        Self { sheets, sync }
    }
}
