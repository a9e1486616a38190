//! Manual and scheduled sheet sync for properties (task sheets) and companies
//! (property sheets).

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use db::{
    DBService,
    models::{
        company::Company, property::Property, sheet_sync::SheetSyncKind,
        sheet_sync::SheetSyncSettings,
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{task::JoinHandle, time::interval};
use tracing::{debug, error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    google_sheets::SheetSource,
    notification::Notifier,
    sheet_import::{
        ImportError, ImportRequest, SyncResult, mapping::ColumnMapping,
        properties::PropertyImporter, tasks::TaskImporter, validate_mapping,
    },
};

/// Used when a stored configuration has no tab name
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

pub type ManualSyncRequest = ImportRequest;

#[derive(Debug, Error)]
pub enum SheetSyncError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("property {0} not found")]
    PropertyNotFound(Uuid),
    #[error("company {0} not found")]
    CompanyNotFound(Uuid),
}

/// Result of syncing one entity during a scheduled run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct EntitySyncOutcome {
    pub kind: SheetSyncKind,
    pub entity_id: Uuid,
    pub success: bool,
    pub message: Option<String>,
    pub result: Option<SyncResult>,
}

impl EntitySyncOutcome {
    fn completed(kind: SheetSyncKind, entity_id: Uuid, result: SyncResult) -> Self {
        Self {
            kind,
            entity_id,
            success: result.success,
            message: None,
            result: Some(result),
        }
    }

    fn failed(kind: SheetSyncKind, entity_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id,
            success: false,
            message: Some(message.into()),
            result: None,
        }
    }
}

pub struct SheetSyncService {
    db: DBService,
    tasks: TaskImporter,
    properties: PropertyImporter,
}

impl SheetSyncService {
    pub fn new(db: DBService, source: Arc<dyn SheetSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            tasks: TaskImporter::new(db.clone(), source.clone(), notifier),
            properties: PropertyImporter::new(db.clone(), source),
            db,
        }
    }

    /// Store the sheet configuration on the property, enable sync and import
    /// once. A mapping that could never import is rejected before anything is
    /// stored.
    pub async fn sync_property_tasks(
        &self,
        property_id: Uuid,
        request: &ManualSyncRequest,
    ) -> Result<SyncResult, SheetSyncError> {
        if Property::find_by_id(&self.db.pool, property_id).await?.is_none() {
            return Err(SheetSyncError::PropertyNotFound(property_id));
        }
        validate_mapping(&request.column_mapping, SheetSyncKind::Tasks)?;

        Property::update_sync_settings(&self.db.pool, property_id, &settings_for(request)).await?;
        info!(
            property_id = %property_id,
            spreadsheet_id = %request.spreadsheet_id,
            sheet_name = %request.sheet_name,
            "Task sheet sync configured"
        );

        Ok(self.tasks.import(property_id, request).await?)
    }

    /// Store the sheet configuration on the company, enable sync and import once
    pub async fn sync_company_properties(
        &self,
        company_id: Uuid,
        request: &ManualSyncRequest,
    ) -> Result<SyncResult, SheetSyncError> {
        if Company::find_by_id(&self.db.pool, company_id).await?.is_none() {
            return Err(SheetSyncError::CompanyNotFound(company_id));
        }
        validate_mapping(&request.column_mapping, SheetSyncKind::Properties)?;

        Company::update_sync_settings(&self.db.pool, company_id, &settings_for(request)).await?;
        info!(
            company_id = %company_id,
            spreadsheet_id = %request.spreadsheet_id,
            sheet_name = %request.sheet_name,
            "Property sheet sync configured"
        );

        Ok(self.properties.import(company_id, request).await?)
    }

    pub async fn disable_property_sync(&self, property_id: Uuid) -> Result<(), SheetSyncError> {
        if Property::set_sync_enabled(&self.db.pool, property_id, false).await? == 0 {
            return Err(SheetSyncError::PropertyNotFound(property_id));
        }
        info!(property_id = %property_id, "Task sheet sync disabled");
        Ok(())
    }

    pub async fn disable_company_sync(&self, company_id: Uuid) -> Result<(), SheetSyncError> {
        if Company::set_sync_enabled(&self.db.pool, company_id, false).await? == 0 {
            return Err(SheetSyncError::CompanyNotFound(company_id));
        }
        info!(company_id = %company_id, "Property sheet sync disabled");
        Ok(())
    }

    /// Sync every enabled property, then every enabled company, one at a time.
    /// Only failing to list the entities is fatal.
    pub async fn run_scheduled(&self) -> Result<Vec<EntitySyncOutcome>, SheetSyncError> {
        let properties = Property::find_sync_enabled(&self.db.pool).await?;
        let companies = Company::find_sync_enabled(&self.db.pool).await?;

        if properties.is_empty() && companies.is_empty() {
            debug!("Sheet sync: nothing enabled");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(properties.len() + companies.len());

        for property in properties {
            let outcome = match stored_request(&property.sync_settings()) {
                Ok(request) => match self.tasks.import(property.id, &request).await {
                    Ok(result) => {
                        EntitySyncOutcome::completed(SheetSyncKind::Tasks, property.id, result)
                    }
                    Err(e) => {
                        warn!(property_id = %property.id, error = %e, "Scheduled task sync failed");
                        EntitySyncOutcome::failed(SheetSyncKind::Tasks, property.id, e.to_string())
                    }
                },
                Err(message) => {
                    debug!(property_id = %property.id, %message, "Skipping task sheet sync");
                    EntitySyncOutcome::failed(SheetSyncKind::Tasks, property.id, message)
                }
            };
            outcomes.push(outcome);
        }

        for company in companies {
            let outcome = match stored_request(&company.sync_settings()) {
                Ok(request) => match self.properties.import(company.id, &request).await {
                    Ok(result) => {
                        EntitySyncOutcome::completed(SheetSyncKind::Properties, company.id, result)
                    }
                    Err(e) => {
                        warn!(company_id = %company.id, error = %e, "Scheduled property sync failed");
                        EntitySyncOutcome::failed(
                            SheetSyncKind::Properties,
                            company.id,
                            e.to_string(),
                        )
                    }
                },
                Err(message) => {
                    debug!(company_id = %company.id, %message, "Skipping property sheet sync");
                    EntitySyncOutcome::failed(SheetSyncKind::Properties, company.id, message)
                }
            };
            outcomes.push(outcome);
        }

        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(
            entities = outcomes.len(),
            failed = failed,
            "Scheduled sheet sync finished"
        );

        Ok(outcomes)
    }
}

fn settings_for(request: &ImportRequest) -> SheetSyncSettings {
    SheetSyncSettings::enabled(
        request.spreadsheet_id.clone(),
        request.sheet_name.clone(),
        request.column_mapping.to_json(),
        request.unique_column.clone(),
    )
}

/// Rebuild the import request from stored settings; `Err` carries the reason
/// the entity is skipped.
fn stored_request(settings: &SheetSyncSettings) -> Result<ImportRequest, String> {
    let spreadsheet_id = settings
        .sheet_id
        .clone()
        .ok_or_else(|| "no spreadsheet configured".to_string())?;

    let column_mapping = match settings.column_mapping.as_deref().map(str::trim) {
        None | Some("") => return Err("no column mapping configured".to_string()),
        Some(json) => ColumnMapping::from_json(json)
            .map_err(|e| format!("stored column mapping is not valid JSON: {e}"))?,
    };
    if column_mapping.is_empty() {
        return Err("no column mapping configured".to_string());
    }

    Ok(ImportRequest {
        spreadsheet_id,
        sheet_name: settings
            .sheet_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
        column_mapping,
        unique_column: settings.unique_column.clone(),
    })
}

/// Process-wide scheduler flag, created once at startup and shared
#[derive(Debug, Default)]
pub struct SchedulerState {
    initialized: AtomicBool,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for exactly one caller
    pub fn try_initialize(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// Background loop running [`SheetSyncService::run_scheduled`]
pub struct SheetSyncScheduler {
    service: Arc<SheetSyncService>,
    poll_interval: Duration,
}

impl SheetSyncScheduler {
    /// Spawn the loop; `None` if `state` says one is already running
    pub fn spawn(
        service: Arc<SheetSyncService>,
        state: Arc<SchedulerState>,
        poll_interval: Duration,
    ) -> Option<JoinHandle<()>> {
        if !state.try_initialize() {
            warn!("Sheet sync scheduler already initialized; not starting another");
            return None;
        }

        let scheduler = Self {
            service,
            poll_interval,
        };
        Some(tokio::spawn(async move {
            scheduler.start().await;
        }))
    }

    async fn start(&self) {
        info!(
            "Starting sheet sync scheduler with interval {:?}",
            self.poll_interval
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.service.run_scheduled().await {
                error!("Error running scheduled sheet sync: {}", e);
            }
        }
    }
}
