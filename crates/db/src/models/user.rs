use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    Owner,
    Manager,
    #[default]
    Cleaner,
}

impl UserRole {
    /// Roles that receive tenant-wide "task created" notifications
    pub fn is_manager_level(&self) -> bool {
        matches!(self, UserRole::Owner | UserRole::Manager)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub company_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

const USER_COLUMNS: &str =
    "id, company_id, email, name, role, is_active, created_at, updated_at";

impl User {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateUser,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, company_id, email, name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(data.company_id)
        .bind(data.email.trim())
        .bind(&data.name)
        .bind(data.role)
        .fetch_one(pool)
        .await
    }

    /// Email lookup is case-insensitive (column collation)
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    pub async fn find_active_by_company_id(
        pool: &SqlitePool,
        company_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE company_id = $1 AND is_active = 1
             ORDER BY created_at ASC"
        ))
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_active(pool: &SqlitePool, id: Uuid, is_active: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET is_active = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(pool)
        .await?;
        Ok(())
    }
}
