use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// Which kind of rows a synced sheet feeds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SheetSyncKind {
    /// Task rows, owned by a property
    Tasks,
    /// Property rows, owned by a company
    Properties,
}

/// Sheet sync configuration stored alongside a property (tasks) or a company (properties)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct SheetSyncSettings {
    pub enabled: bool,
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub column_mapping: Option<String>,
    pub unique_column: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SheetSyncSettings {
    pub fn enabled(
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        column_mapping: impl Into<String>,
        unique_column: Option<String>,
    ) -> Self {
        Self {
            enabled: true,
            sheet_id: Some(sheet_id.into()),
            sheet_name: Some(sheet_name.into()),
            column_mapping: Some(column_mapping.into()),
            unique_column: unique_column.filter(|c| !c.trim().is_empty()),
            last_synced_at: None,
        }
    }
}
