use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::sheet_sync::SheetSyncSettings;

/// Tenant. Owns users and properties, and optionally a property import sheet.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub sheet_sync_enabled: bool,
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub column_mapping: Option<String>, // JSON-serialized ColumnMapping
    pub unique_column: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const COMPANY_COLUMNS: &str = "id, name, sheet_sync_enabled, sheet_id, sheet_name, column_mapping, unique_column, last_synced_at, created_at, updated_at";

impl Company {
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

    pub async fn create(pool: &SqlitePool, id: Uuid, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (id, name) VALUES ($1, $2) RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Companies whose property sheet should be picked up by the scheduled sync
    pub async fn find_sync_enabled(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies
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
            r#"UPDATE companies
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
            "UPDATE companies SET sheet_sync_enabled = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
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
        sqlx::query("UPDATE companies SET last_synced_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }
}
