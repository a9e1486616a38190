//! Sheet rows → tasks and properties.

pub mod dates;
pub mod mapping;
pub mod marker;
pub mod properties;
pub mod row_parser;
pub mod tasks;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use self::mapping::ColumnMapping;
use super::google_sheets::{SheetSource, SheetsError};
use db::models::sheet_sync::SheetSyncKind;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("property {0} not found")]
    PropertyNotFound(Uuid),
    #[error("company {0} not found")]
    CompanyNotFound(Uuid),
    #[error("invalid column mapping: {0}")]
    InvalidMapping(String),
    #[error("sheet '{sheet_name}' has a header row but no data rows")]
    NoDataRows { sheet_name: String },
}

/// Why a single row was rejected
#[derive(Debug, Error)]
pub enum RowFailure {
    #[error("invalid date in '{field}': '{value}' (expected YYYY-MM-DD or DD/MM/YYYY)")]
    InvalidDate { field: &'static str, value: String },
    #[error("unknown status '{0}'")]
    InvalidStatus(String),
    #[error(
        "invalid property type '{0}' (expected one of: block, apartment, hmo, house, commercial)"
    )]
    InvalidPropertyType(String),
    #[error("invalid unit count '{0}' (expected a whole number)")]
    InvalidUnitCount(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Where to read from and how to interpret the columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub column_mapping: ColumnMapping,
    #[serde(default)]
    pub unique_column: Option<String>,
}

impl ImportRequest {
    pub fn unique_column(&self) -> Option<&str> {
        self.unique_column
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// A row that failed; the batch carried on without it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct RowError {
    pub row: usize,
    pub data: BTreeMap<String, String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct SyncResult {
    pub success: bool,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub error_details: Vec<RowError>,
}

impl SyncResult {
    pub(crate) fn new(skipped: usize) -> Self {
        Self {
            success: true,
            skipped,
            ..Default::default()
        }
    }

    pub(crate) fn record_error(
        &mut self,
        row: usize,
        data: BTreeMap<String, String>,
        message: impl Into<String>,
    ) {
        self.errors += 1;
        self.error_details.push(RowError {
            row,
            data,
            message: message.into(),
        });
    }
}

/// What a row resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowOutcome {
    Created,
    Updated,
}

/// How an existing record was looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    Marker,
    Heuristic,
}

/// Running totals of one import
#[derive(Debug)]
pub(crate) struct ImportTally {
    pub result: SyncResult,
    /// Imported rows that were matched without a unique value
    pub heuristic_rows: usize,
}

impl ImportTally {
    pub fn new(skipped: usize) -> Self {
        Self {
            result: SyncResult::new(skipped),
            heuristic_rows: 0,
        }
    }

    pub fn record_success(&mut self, outcome: RowOutcome, lookup: Lookup) {
        if lookup == Lookup::Heuristic {
            self.heuristic_rows += 1;
        }
        match outcome {
            RowOutcome::Created => self.result.created += 1,
            RowOutcome::Updated => self.result.updated += 1,
        }
    }
}

/// Rejects a mapping that could never import a row
pub fn validate_mapping(mapping: &ColumnMapping, kind: SheetSyncKind) -> Result<(), ImportError> {
    if mapping.is_empty() {
        return Err(ImportError::InvalidMapping("column mapping is empty".to_string()));
    }
    if !mapping.has_required(kind) {
        let required = match kind {
            SheetSyncKind::Tasks => "title",
            SheetSyncKind::Properties => "address",
        };
        return Err(ImportError::InvalidMapping(format!(
            "no column is mapped to '{required}'"
        )));
    }
    Ok(())
}

/// Headers plus all rows of the requested tab. Fatal errors surface here,
/// before any row is touched.
pub(crate) async fn load_sheet(
    source: &dyn SheetSource,
    request: &ImportRequest,
    kind: SheetSyncKind,
) -> Result<(Vec<String>, Vec<Vec<String>>), ImportError> {
    validate_mapping(&request.column_mapping, kind)?;

    let headers = source
        .fetch_headers(&request.spreadsheet_id, &request.sheet_name)
        .await?;
    let rows = source
        .fetch_rows(&request.spreadsheet_id, &request.sheet_name)
        .await?;

    if rows.len() < 2 {
        return Err(ImportError::NoDataRows {
            sheet_name: request.sheet_name.clone(),
        });
    }

    debug!(
        spreadsheet_id = %request.spreadsheet_id,
        sheet_name = %request.sheet_name,
        columns = headers.len(),
        rows = rows.len() - 1,
        "Loaded sheet"
    );

    Ok((headers, rows))
}


#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use uuid::Uuid;

    use db::models::notification::NotificationKind;

    use super::super::{
        google_sheets::{SheetSource, SheetsError, SpreadsheetMetadata},
        notification::{NotificationError, Notifier},
    };

    /// In-memory sheet; row 0 is the header row
    #[derive(Default)]
    pub struct FakeSheet {
        rows: Mutex<Vec<Vec<String>>>,
        error: Option<SheetsError>,
        /// Only this spreadsheet fails when set
        error_for: Option<String>,
    }

    impl FakeSheet {
        pub fn new(rows: &[&[&str]]) -> Self {
            let sheet = Self::default();
            sheet.set_rows(rows);
            sheet
        }

        pub fn failing(error: SheetsError) -> Self {
            Self {
                error: Some(error),
                ..Default::default()
            }
        }

        /// Serves `rows` for every spreadsheet except `spreadsheet_id`
        pub fn failing_for(rows: &[&[&str]], spreadsheet_id: &str, error: SheetsError) -> Self {
            let sheet = Self {
                error: Some(error),
                error_for: Some(spreadsheet_id.to_string()),
                ..Default::default()
            };
            sheet.set_rows(rows);
            sheet
        }

        pub fn set_rows(&self, rows: &[&[&str]]) {
            *self.rows.lock().unwrap() = rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect();
        }

        fn check(&self, spreadsheet_id: &str) -> Result<(), SheetsError> {
            match (&self.error, &self.error_for) {
                (Some(error), Some(only)) if only == spreadsheet_id => Err(error.clone()),
                (Some(error), None) => Err(error.clone()),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl SheetSource for FakeSheet {
        async fn spreadsheet_metadata(
            &self,
            spreadsheet_id: &str,
        ) -> Result<SpreadsheetMetadata, SheetsError> {
            self.check(spreadsheet_id)?;
            Ok(SpreadsheetMetadata {
                spreadsheet_id: spreadsheet_id.to_string(),
                title: "Fake".to_string(),
                sheets: Vec::new(),
            })
        }

        async fn fetch_headers(
            &self,
            spreadsheet_id: &str,
            sheet_name: &str,
        ) -> Result<Vec<String>, SheetsError> {
            self.check(spreadsheet_id)?;
            match self.rows.lock().unwrap().first() {
                Some(headers) if !headers.is_empty() => Ok(headers.clone()),
                _ => Err(SheetsError::EmptyData {
                    sheet_name: sheet_name.to_string(),
                }),
            }
        }

        async fn fetch_rows(
            &self,
            spreadsheet_id: &str,
            _sheet_name: &str,
        ) -> Result<Vec<Vec<String>>, SheetsError> {
            self.check(spreadsheet_id)?;
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sent {
        pub user_id: Uuid,
        pub kind: NotificationKind,
        pub task_id: Option<Uuid>,
    }

    /// Records every notification; can be told to fail for one user
    #[derive(Default, Clone)]
    pub struct RecordingNotifier {
        pub sent: Arc<Mutex<Vec<Sent>>>,
        pub fail_for: Option<Uuid>,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(
            &self,
            user_id: Uuid,
            kind: NotificationKind,
            _title: &str,
            _message: &str,
            task_id: Option<Uuid>,
        ) -> Result<(), NotificationError> {
            if self.fail_for == Some(user_id) {
                return Err(NotificationError::Delivery(format!("refused for {user_id}")));
            }
            self.sent.lock().unwrap().push(Sent {
                user_id,
                kind,
                task_id,
            });
            Ok(())
        }
    }
}
