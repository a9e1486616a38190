//! Turns raw sheet rows into typed import records via a [`ColumnMapping`].

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use db::models::sheet_sync::SheetSyncKind;
use tracing::debug;

use super::mapping::{ColumnMapping, PropertyField, TaskField};

/// A typed record assembled from one sheet row
pub trait ImportRecord: Sized {
    const KIND: SheetSyncKind;
    type Field: FromStr + Display + Copy;

    /// `None` when the mandatory field is missing
    fn assemble(values: Vec<(Self::Field, String)>) -> Option<Self>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskImportRow {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Option<String>,
    pub move_in_date: Option<String>,
    pub assigned_user_email: Option<String>,
    pub status: Option<String>,
}

impl ImportRecord for TaskImportRow {
    const KIND: SheetSyncKind = SheetSyncKind::Tasks;
    type Field = TaskField;

    fn assemble(values: Vec<(TaskField, String)>) -> Option<Self> {
        let mut title = None;
        let mut row = TaskImportRow::default();
        for (field, value) in values {
            match field {
                TaskField::Title => title = Some(value),
                TaskField::Description => row.description = Some(value),
                TaskField::ScheduledDate => row.scheduled_date = Some(value),
                TaskField::MoveInDate => row.move_in_date = Some(value),
                TaskField::AssignedUserEmail => row.assigned_user_email = Some(value),
                TaskField::Status => row.status = Some(value),
            }
        }
        row.title = title?;
        Some(row)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyImportRow {
    pub address: String,
    pub postcode: Option<String>,
    pub property_type: Option<String>,
    pub unit_count: Option<String>,
    pub notes: Option<String>,
}

impl ImportRecord for PropertyImportRow {
    const KIND: SheetSyncKind = SheetSyncKind::Properties;
    type Field = PropertyField;

    fn assemble(values: Vec<(PropertyField, String)>) -> Option<Self> {
        let mut address = None;
        let mut row = PropertyImportRow::default();
        for (field, value) in values {
            match field {
                PropertyField::Address => address = Some(value),
                PropertyField::Postcode => row.postcode = Some(value),
                PropertyField::PropertyType => row.property_type = Some(value),
                PropertyField::UnitCount => row.unit_count = Some(value),
                PropertyField::Notes => row.notes = Some(value),
            }
        }
        row.address = address?;
        Some(row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow<R> {
    /// 1-based sheet row, header is row 1
    pub row_number: usize,
    pub record: R,
    /// Mapped field name → trimmed value, kept for error reports
    pub fields: BTreeMap<String, String>,
    pub unique_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSheet<R> {
    pub rows: Vec<ParsedRow<R>>,
    /// Rows with content but without the mandatory field
    pub skipped: usize,
}

/// Parse `rows` (row 0 is the header row) into typed records.
///
/// Mapping entries whose column is not among `headers` are ignored, as are
/// entries targeting unknown fields. Empty and whitespace-only cells count as
/// absent. Sheet order is preserved.
pub fn parse_rows<R: ImportRecord>(
    rows: &[Vec<String>],
    headers: &[String],
    mapping: &ColumnMapping,
    unique_column: Option<&str>,
) -> ParsedSheet<R> {
    let resolved: Vec<(R::Field, usize)> = mapping
        .typed_entries::<R::Field>()
        .into_iter()
        .filter_map(|(column, field)| match headers.iter().position(|h| h == column) {
            Some(index) => Some((field, index)),
            None => {
                debug!(column = %column, field = %field, "Mapped column not found in sheet headers");
                None
            }
        })
        .collect();

    let unique_index = unique_column
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .and_then(|column| headers.iter().position(|h| h == column));

    let mut parsed = ParsedSheet {
        rows: Vec::new(),
        skipped: 0,
    };

    for (index, raw) in rows.iter().enumerate().skip(1) {
        if raw.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut values = Vec::with_capacity(resolved.len());
        let mut fields = BTreeMap::new();
        for (field, column_index) in &resolved {
            if let Some(value) = cell(raw, *column_index) {
                fields.insert(field.to_string(), value.clone());
                values.push((*field, value));
            }
        }

        let row_number = index + 1;
        match R::assemble(values) {
            Some(record) => parsed.rows.push(ParsedRow {
                row_number,
                record,
                fields,
                unique_value: unique_index.and_then(|i| cell(raw, i)),
            }),
            None => {
                debug!(row = row_number, kind = %R::KIND, "Skipping row without mandatory field");
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn cell(row: &[String], index: usize) -> Option<String> {
    row.get(index)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
