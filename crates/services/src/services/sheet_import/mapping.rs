use std::{collections::BTreeMap, fmt, str::FromStr};

use db::models::sheet_sync::SheetSyncKind;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Internal task fields a sheet column can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
pub enum TaskField {
    Title,
    Description,
    ScheduledDate,
    MoveInDate,
    AssignedUserEmail,
    Status,
}

/// Internal property fields a sheet column can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "camelCase")]
pub enum PropertyField {
    Address,
    Postcode,
    PropertyType,
    UnitCount,
    Notes,
}

/// Sheet column header (exact, case-sensitive) → internal field name.
/// Wire form is a flat JSON object of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<String, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // A map of strings always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }

    /// Later inserts for the same column replace earlier ones
    pub fn insert(&mut self, column: impl Into<String>, field: impl Into<String>) {
        self.0.insert(column.into(), field.into());
    }

    pub fn with(mut self, column: impl Into<String>, field: impl Into<String>) -> Self {
        self.insert(column, field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(c, f)| (c.as_str(), f.as_str()))
    }

    /// Entries whose target parses as `F`; unknown targets are left out
    pub fn typed_entries<F: FromStr>(&self) -> Vec<(&str, F)> {
        self.iter()
            .filter_map(|(column, field)| F::from_str(field.trim()).ok().map(|f| (column, f)))
            .collect()
    }

    /// Whether the mandatory field of `kind` is mapped from some column
    pub fn has_required(&self, kind: SheetSyncKind) -> bool {
        match kind {
            SheetSyncKind::Tasks => self
                .typed_entries::<TaskField>()
                .iter()
                .any(|(_, f)| *f == TaskField::Title),
            SheetSyncKind::Properties => self
                .typed_entries::<PropertyField>()
                .iter()
                .any(|(_, f)| *f == PropertyField::Address),
        }
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl FromIterator<(String, String)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_json_wire_format() {
        let mapping = ColumnMapping::from_json(
            r#"{"Task Name":"title","Date":"scheduledDate","Unique ID":"uniqueId"}"#,
        )
        .unwrap();
        assert_eq!(mapping.len(), 3);

        let reparsed = ColumnMapping::from_json(&mapping.to_json()).unwrap();
        assert_eq!(reparsed, mapping);
    }

    #[test]
    fn test_typed_entries_skip_unknown_targets() {
        let mapping = ColumnMapping::new()
            .with("Task Name", "title")
            .with("When", "scheduledDate")
            .with("Unique ID", "uniqueId");

        let entries = mapping.typed_entries::<TaskField>();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&("Task Name", TaskField::Title)));
        assert!(entries.contains(&("When", TaskField::ScheduledDate)));
    }

    #[test]
    fn test_field_names_are_camel_case() {
        assert_eq!(TaskField::from_str("moveInDate").unwrap(), TaskField::MoveInDate);
        assert_eq!(
            TaskField::from_str("assignedUserEmail").unwrap(),
            TaskField::AssignedUserEmail
        );
        assert_eq!(PropertyField::from_str("unitCount").unwrap(), PropertyField::UnitCount);
        assert_eq!(PropertyField::PropertyType.to_string(), "propertyType");
    }

    #[test]
    fn test_has_required() {
        let tasks = ColumnMapping::new().with("Name", "title");
        assert!(tasks.has_required(SheetSyncKind::Tasks));
        assert!(!tasks.has_required(SheetSyncKind::Properties));

        let empty = ColumnMapping::new();
        assert!(!empty.has_required(SheetSyncKind::Tasks));
    }

    #[test]
    fn test_rejects_non_object_json() {
        assert!(ColumnMapping::from_json("[1,2]").is_err());
        assert!(ColumnMapping::from_json(r#"{"a": 1}"#).is_err());
    }
}
