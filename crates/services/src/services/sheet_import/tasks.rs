//! Task rows of a property's sheet → tasks of that property.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use db::{
    DBService,
    models::{
        notification::NotificationKind,
        property::Property,
        task::{CreateTask, Task, TaskStatus, UpdateTask},
        user::User,
    },
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ImportError, ImportRequest, ImportTally, Lookup, RowFailure, RowOutcome, SyncResult,
    dates::parse_sheet_date,
    load_sheet,
    marker::{compose_description, format_marker, recompose_description},
    row_parser::{ImportRecord, ParsedRow, TaskImportRow, parse_rows},
};
use crate::services::{
    google_sheets::SheetSource,
    notification::{Notifier, manager_recipients, notify_each},
};

pub struct TaskImporter {
    db: DBService,
    source: Arc<dyn SheetSource>,
    notifier: Arc<dyn Notifier>,
}

impl TaskImporter {
    pub fn new(db: DBService, source: Arc<dyn SheetSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            source,
            notifier,
        }
    }

    /// Import every row of the sheet into the property's tasks. Row failures
    /// are collected in the result; only sheet-level problems return `Err`.
    pub async fn import(
        &self,
        property_id: Uuid,
        request: &ImportRequest,
    ) -> Result<SyncResult, ImportError> {
        let property = Property::find_by_id(&self.db.pool, property_id)
            .await?
            .ok_or(ImportError::PropertyNotFound(property_id))?;

        let (headers, rows) =
            load_sheet(self.source.as_ref(), request, TaskImportRow::KIND).await?;
        let parsed = parse_rows::<TaskImportRow>(
            &rows,
            &headers,
            &request.column_mapping,
            request.unique_column(),
        );

        let mut tally = ImportTally::new(parsed.skipped);

        for row in &parsed.rows {
            match self.import_row(&property, row).await {
                Ok((outcome, lookup)) => tally.record_success(outcome, lookup),
                Err(e) => {
                    warn!(
                        property_id = %property.id,
                        row = row.row_number,
                        error = %e,
                        "Task row import failed"
                    );
                    tally
                        .result
                        .record_error(row.row_number, row.fields.clone(), e.to_string());
                }
            }
        }

        let ImportTally {
            result,
            heuristic_rows,
        } = tally;
        if heuristic_rows > 0 {
            warn!(
                property_id = %property.id,
                rows = heuristic_rows,
                unique_column = ?request.unique_column(),
                "Rows without a unique value were matched by title and date; duplicates may be merged or created"
            );
        }

        Property::touch_last_synced(&self.db.pool, property.id, Utc::now()).await?;

        info!(
            property_id = %property.id,
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.errors,
            "Task sheet import finished"
        );

        Ok(result)
    }

    async fn import_row(
        &self,
        property: &Property,
        row: &ParsedRow<TaskImportRow>,
    ) -> Result<(RowOutcome, Lookup), RowFailure> {
        let record = &row.record;
        let scheduled_date = parse_date_field("scheduledDate", record.scheduled_date.as_deref())?;
        let move_in_date = parse_date_field("moveInDate", record.move_in_date.as_deref())?;
        let sheet_status = record
            .status
            .as_deref()
            .map(|raw| TaskStatus::from_sheet_value(raw).ok_or_else(|| RowFailure::InvalidStatus(raw.to_string())))
            .transpose()?;

        let assignee = match record.assigned_user_email.as_deref() {
            Some(email) => self.resolve_assignee(property.company_id, email).await?,
            None => None,
        };

        let (existing, lookup) = match row.unique_value.as_deref() {
            Some(value) => (
                Task::find_by_marker(&self.db.pool, property.id, &format_marker(value)).await?,
                Lookup::Marker,
            ),
            None => (
                Task::find_by_title_and_date(
                    &self.db.pool,
                    property.id,
                    &record.title,
                    scheduled_date,
                )
                .await?,
                Lookup::Heuristic,
            ),
        };

        let status = derive_status(scheduled_date, move_in_date, sheet_status);

        match existing {
            Some(task) => {
                let description = recompose_description(
                    task.description.as_deref(),
                    row.unique_value.as_deref(),
                    record.description.as_deref(),
                );
                Task::update(
                    &self.db.pool,
                    task.id,
                    &UpdateTask {
                        title: Some(record.title.clone()),
                        description,
                        status: Some(status),
                        scheduled_date,
                        move_in_date,
                        assigned_user_id: assignee,
                    },
                )
                .await?;
                debug!(task_id = %task.id, row = row.row_number, ?lookup, "Updated task from sheet");
                Ok((RowOutcome::Updated, lookup))
            }
            None => {
                let description =
                    compose_description(row.unique_value.as_deref(), record.description.as_deref());
                let task = Task::create(
                    &self.db.pool,
                    &CreateTask {
                        property_id: property.id,
                        title: record.title.clone(),
                        description,
                        status: Some(status),
                        scheduled_date,
                        move_in_date,
                        assigned_user_id: assignee,
                    },
                    Uuid::new_v4(),
                )
                .await?;
                debug!(task_id = %task.id, row = row.row_number, "Created task from sheet");
                self.notify_created(property, &task).await;
                Ok((RowOutcome::Created, lookup))
            }
        }
    }

    /// A user of another company is never assigned
    async fn resolve_assignee(
        &self,
        company_id: Uuid,
        email: &str,
    ) -> Result<Option<Uuid>, RowFailure> {
        match User::find_by_email(&self.db.pool, email).await? {
            Some(user) if user.company_id == company_id => Ok(Some(user.id)),
            Some(user) => {
                debug!(
                    user_id = %user.id,
                    company_id = %company_id,
                    "Assignee belongs to another company; leaving task unassigned"
                );
                Ok(None)
            }
            None => {
                debug!(email = %email, "No user with assignee email");
                Ok(None)
            }
        }
    }

    async fn notify_created(&self, property: &Property, task: &Task) {
        let message = format!("{} at {}", task.title, property.address);
        match task.assigned_user_id {
            Some(user_id) => {
                notify_each(
                    self.notifier.as_ref(),
                    &[user_id],
                    NotificationKind::TaskAssigned,
                    "Task assigned to you",
                    &message,
                    Some(task.id),
                )
                .await;
            }
            None => match manager_recipients(&self.db, property.company_id).await {
                Ok(recipients) => {
                    notify_each(
                        self.notifier.as_ref(),
                        &recipients,
                        NotificationKind::TaskCreated,
                        "New task imported",
                        &message,
                        Some(task.id),
                    )
                    .await;
                }
                Err(e) => warn!(
                    task_id = %task.id,
                    error = %e,
                    "Could not load notification recipients"
                ),
            },
        }
    }
}

fn parse_date_field(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, RowFailure> {
    raw.map(|value| {
        parse_sheet_date(value).ok_or_else(|| RowFailure::InvalidDate {
            field,
            value: value.to_string(),
        })
    })
    .transpose()
}

/// A unit with a move-in on or after its next scheduled date is reserved,
/// whatever the sheet says. Otherwise the sheet's status, or planning.
fn derive_status(
    scheduled_date: Option<NaiveDate>,
    move_in_date: Option<NaiveDate>,
    sheet_status: Option<TaskStatus>,
) -> TaskStatus {
    match (scheduled_date, move_in_date) {
        (Some(scheduled), Some(move_in)) if move_in >= scheduled => TaskStatus::Reserved,
        (None, Some(_)) => TaskStatus::Reserved,
        _ => sheet_status.unwrap_or_default(),
    }
}
