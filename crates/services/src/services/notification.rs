//! In-app notifications raised by imports.

use async_trait::async_trait;
use db::{
    DBService,
    models::{
        notification::{CreateNotification, Notification, NotificationKind},
        user::User,
    },
};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        task_id: Option<Uuid>,
    ) -> Result<(), NotificationError>;
}

/// Stores notifications in the `notifications` table
#[derive(Clone)]
pub struct NotificationService {
    db: DBService,
}

impl NotificationService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        task_id: Option<Uuid>,
    ) -> Result<(), NotificationError> {
        let notification = Notification::create(
            &self.db.pool,
            &CreateNotification {
                user_id,
                kind,
                title: title.to_string(),
                message: message.to_string(),
                task_id,
            },
            Uuid::new_v4(),
        )
        .await?;

        info!(
            notification_id = %notification.id,
            user_id = %user_id,
            kind = %kind,
            "Notification stored"
        );
        Ok(())
    }
}

/// Sends to each recipient in turn. A failure is logged and the rest still
/// get theirs; returns how many were delivered.
pub async fn notify_each(
    notifier: &dyn Notifier,
    recipients: &[Uuid],
    kind: NotificationKind,
    title: &str,
    message: &str,
    task_id: Option<Uuid>,
) -> usize {
    let mut delivered = 0;
    for user_id in recipients {
        match notifier.notify(*user_id, kind, title, message, task_id).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(
                user_id = %user_id,
                kind = %kind,
                error = %e,
                "Failed to send notification"
            ),
        }
    }
    delivered
}

/// Active owners and managers of a company
pub async fn manager_recipients(
    db: &DBService,
    company_id: Uuid,
) -> Result<Vec<Uuid>, NotificationError> {
    Ok(User::find_active_by_company_id(&db.pool, company_id)
        .await?
        .into_iter()
        .filter(|u| u.role.is_manager_level())
        .map(|u| u.id)
        .collect())
}
