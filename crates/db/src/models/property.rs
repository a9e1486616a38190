use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::sheet_sync::SheetSyncSettings;

/// Closed set of property types. Parsing is case-insensitive, storage is lowercase.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "property_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PropertyType {
    Block,
    Apartment,
    Hmo,
    House,
    Commercial,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Property {
    pub id: Uuid,
    pub company_id: Uuid, // Foreign key to Company (tenant)
    pub address: String,
    pub postcode: Option<String>,
    pub property_type: Option<PropertyType>,
    pub unit_count: Option<i64>,
    pub notes: Option<String>, // Carries the [UNIQUE:..] marker for imported rows
    pub sheet_sync_enabled: bool,
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub column_mapping: Option<String>, // JSON-serialized ColumnMapping for the task sheet
    pub unique_column: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateProperty {
    pub company_id: Uuid,
    pub address: String,
    pub postcode: Option<String>,
    pub property_type: Option<PropertyType>,
    pub unit_count: Option<i64>,
    pub notes: Option<String>,
}

impl CreateProperty {
    pub fn from_address(company_id: Uuid, address: impl Into<String>) -> Self {
        Self {
            company_id,
            address: address.into(),
            postcode: None,
            property_type: None,
            unit_count: None,
            notes: None,
        }
    }
}

/// Partial update: `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateProperty {
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub property_type: Option<PropertyType>,
    pub unit_count: Option<i64>,
    pub notes: Option<String>,
}

const PROPERTY_COLUMNS: &str = "id, company_id, address, postcode, property_type, unit_count, notes, sheet_sync_enabled, sheet_id, sheet_name, column_mapping, unique_column, last_synced_at, created_at, updated_at";

impl Property {
    pub fn sync_settings(&self) -> SheetSyncSettings {
        SheetSyncSettings {
            enabled: self.sheet_sync_enabled,
            sheet_id: self.sheet_id.clone(),
            sheet_name: self.sheet_name.clone(),
            column_mapping: self.column_mapping.clone(),
            unique_column: self.unique_column.clone(),
            last_synced_at: self.last_synced_at,
        }
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateProperty,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "INSERT INTO properties (id, company_id, address, postcode, property_type, unit_count, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PROPERTY_COLUMNS}"
        ))
        .bind(id)
        .bind(data.company_id)
        .bind(&data.address)
        .bind(&data.postcode)
        .bind(data.property_type)
        .bind(data.unit_count)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateProperty,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "UPDATE properties
             SET address = COALESCE($2, address),
                 postcode = COALESCE($3, postcode),
                 property_type = COALESCE($4, property_type),
                 unit_count = COALESCE($5, unit_count),
                 notes = COALESCE($6, notes),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {PROPERTY_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.address)
        .bind(&data.postcode)
        .bind(data.property_type)
        .bind(data.unit_count)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_company_id(
        pool: &SqlitePool,
        company_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE company_id = $1 ORDER BY created_at ASC"
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    /// Find a company's property whose notes contain the given marker text.
    /// `instr` is used rather than LIKE so `%` and `_` in sheet values match literally.
    pub async fn find_by_marker(
        pool: &SqlitePool,
        company_id: Uuid,
        marker: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties
             WHERE company_id = $1 AND notes IS NOT NULL AND instr(notes, $2) > 0
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .bind(company_id)
        .bind(marker)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_address(
        pool: &SqlitePool,
        company_id: Uuid,
        address: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties
             WHERE company_id = $1 AND address = $2
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .bind(company_id)
        .bind(address)
        .fetch_optional(pool)
        .await
    }

    /// Properties whose task sheet should be picked up by the scheduled sync
    pub async fn find_sync_enabled(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties
             WHERE sheet_sync_enabled = 1 AND sheet_id IS NOT NULL
             ORDER BY created_at ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn update_sync_settings(
        pool: &SqlitePool,
        id: Uuid,
        settings: &SheetSyncSettings,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE properties
               SET sheet_sync_enabled = $2, sheet_id = $3, sheet_name = $4,
                   column_mapping = $5, unique_column = $6,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(settings.enabled)
        .bind(&settings.sheet_id)
        .bind(&settings.sheet_name)
        .bind(&settings.column_mapping)
        .bind(&settings.unique_column)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_sync_enabled(
        pool: &SqlitePool,
        id: Uuid,
        enabled: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE properties SET sheet_sync_enabled = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(enabled)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn touch_last_synced(
        pool: &SqlitePool,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE properties SET last_synced_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }
}
