use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaskStatus {
    #[default]
    Planning,
    /// Unit is held for a move-in on or after its next available date
    Reserved,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Lenient parse for free-text cells: ignores case, spaces, `_` and `-`,
    /// so "In Progress", "IN_PROGRESS" and "inprogress" are the same status.
    pub fn from_sheet_value(value: &str) -> Option<Self> {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        if compact.is_empty() {
            return None;
        }
        Self::from_str(&compact).ok()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Task {
    pub id: Uuid,
    pub property_id: Uuid, // Foreign key to Property
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub move_in_date: Option<NaiveDate>,
    pub assigned_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateTask {
    pub property_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub move_in_date: Option<NaiveDate>,
    pub assigned_user_id: Option<Uuid>,
}

/// Partial update: `None` keeps the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub move_in_date: Option<NaiveDate>,
    pub assigned_user_id: Option<Uuid>,
}

const TASK_COLUMNS: &str = "id, property_id, title, description, status, scheduled_date, move_in_date, assigned_user_id, created_at, updated_at";

impl Task {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_property_id(
        pool: &SqlitePool,
        property_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE property_id = $1 ORDER BY created_at ASC"
        ))
        .bind(property_id)
        .fetch_all(pool)
        .await
    }

    /// Find a task of the property whose description contains the given marker text.
    /// `instr` keeps `%` and `_` in sheet values literal.
    pub async fn find_by_marker(
        pool: &SqlitePool,
        property_id: Uuid,
        marker: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE property_id = $1 AND description IS NOT NULL AND instr(description, $2) > 0
             ORDER BY created_at ASC
             LIMIT 1"
        ))
        .bind(property_id)
        .bind(marker)
        .fetch_optional(pool)
        .await
    }

    /// Best-effort match by title, narrowed by scheduled date when one is given
    pub async fn find_by_title_and_date(
        pool: &SqlitePool,
        property_id: Uuid,
        title: &str,
        scheduled_date: Option<NaiveDate>,
    ) -> Result<Option<Self>, sqlx::Error> {
        match scheduled_date {
            Some(date) => {
                sqlx::query_as::<_, Task>(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE property_id = $1 AND title = $2 AND scheduled_date = $3
                     ORDER BY created_at ASC
                     LIMIT 1"
                ))
                .bind(property_id)
                .bind(title)
                .bind(date)
                .fetch_optional(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Task>(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE property_id = $1 AND title = $2
                     ORDER BY created_at ASC
                     LIMIT 1"
                ))
                .bind(property_id)
                .bind(title)
                .fetch_optional(pool)
                .await
            }
        }
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let status = data.status.unwrap_or_default();
        sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, property_id, title, description, status, scheduled_date, move_in_date, assigned_user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(data.property_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(status)
        .bind(data.scheduled_date)
        .bind(data.move_in_date)
        .bind(data.assigned_user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 status = COALESCE($4, status),
                 scheduled_date = COALESCE($5, scheduled_date),
                 move_in_date = COALESCE($6, move_in_date),
                 assigned_user_id = COALESCE($7, assigned_user_id),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.scheduled_date)
        .bind(data.move_in_date)
        .bind(data.assigned_user_id)
        .fetch_one(pool)
        .await
    }
}
