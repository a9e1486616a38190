use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use server::{AppState, config::ServerConfig, routes};
use services::services::{
    config::{SheetsConfig, SyncScheduleConfig},
    google_sheets::{SheetSource, UnconfiguredSheets, sheet_source_from_config},
    notification::NotificationService,
    sheet_sync::{SchedulerState, SheetSyncScheduler},
};
use tracing::{info, warn};
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let config = ServerConfig::from_env()?;
    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let sheets: Arc<dyn SheetSource> = match SheetsConfig::from_env() {
        Ok(sheets_config) => sheet_source_from_config(&sheets_config),
        Err(e) => {
            warn!(error = %e, "Could not load Google service account key");
            Arc::new(UnconfiguredSheets::new(e.to_string()))
        }
    };
    let notifier = Arc::new(NotificationService::new(db.clone()));
    let state = AppState::new(db, sheets, notifier);

    let scheduler_state = Arc::new(SchedulerState::new());
    match SyncScheduleConfig::from_env()?.interval {
        Some(interval) => {
            SheetSyncScheduler::spawn(state.sync.clone(), scheduler_state, interval);
        }
        None => info!("Scheduled sheet sync disabled"),
    }

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
