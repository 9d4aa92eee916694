//! Notification log
//!
//! Append-only record of follow and like events, plus the recipient's
//! read/delete operations on their own notifications.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::{AccountId, Database, EntityId, Notification, PublicAccount};
use crate::error::AppError;

/// Destination for notification events
///
/// Callers treat failures as non-fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn record(&self, notification: Notification) -> Result<(), AppError>;
}

/// Notification with the sender's public identity attached
#[derive(Debug, Clone)]
pub struct NotificationView {
    pub id: EntityId,
    pub from: PublicAccount,
    pub to: AccountId,
    pub notification_type: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification log backed by the database
pub struct NotificationLog {
    db: Arc<Database>,
}

impl NotificationLog {
    /// Create new notification log
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List the recipient's notifications, newest first, and mark them read
    ///
    /// Notifications whose sender no longer resolves are skipped.
    pub async fn list(&self, recipient: &AccountId) -> Result<Vec<NotificationView>, AppError> {
        let notifications = self.db.get_notifications_for(recipient).await?;

        let mut sender_ids: Vec<AccountId> = notifications
            .iter()
            .map(|n| n.from_account_id.clone())
            .collect();
        sender_ids.sort();
        sender_ids.dedup();

        let senders: HashMap<AccountId, PublicAccount> = self
            .db
            .get_accounts_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|account| (account.id.clone(), PublicAccount::from(account)))
            .collect();

        self.db.mark_notifications_read(recipient).await?;

        let views = notifications
            .into_iter()
            .filter_map(|notification| {
                let from = senders.get(&notification.from_account_id)?.clone();
                Some(NotificationView {
                    id: notification.id,
                    from,
                    to: notification.to_account_id,
                    notification_type: notification.notification_type,
                    read: notification.read,
                    created_at: notification.created_at,
                })
            })
            .collect();

        Ok(views)
    }

    /// Number of unread notifications for the recipient
    pub async fn unread_count(&self, recipient: &AccountId) -> Result<i64, AppError> {
        self.db.count_unread_notifications(recipient).await
    }

    /// Delete every notification addressed to the recipient
    pub async fn clear(&self, recipient: &AccountId) -> Result<u64, AppError> {
        let deleted = self.db.delete_notifications_for(recipient).await?;
        tracing::debug!(recipient = %recipient, deleted, "Notifications cleared");
        Ok(deleted)
    }

    /// Delete one notification owned by the recipient
    ///
    /// # Errors
    /// `NotFound` if it does not exist, `Unauthorized` if it belongs to
    /// someone else
    pub async fn delete(&self, recipient: &AccountId, id: &EntityId) -> Result<(), AppError> {
        let notification = self
            .db
            .get_notification(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        if &notification.to_account_id != recipient {
            return Err(AppError::Unauthorized(
                "You are not allowed to delete this notification".to_string(),
            ));
        }

        self.db.delete_notification(id).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for NotificationLog {
    async fn record(&self, notification: Notification) -> Result<(), AppError> {
        self.db.insert_notification(&notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Account, NotificationType};
    use tempfile::TempDir;

    async fn setup() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn insert_account(db: &Database, username: &str) -> AccountId {
        let account = Account {
            id: AccountId::new(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            full_name: username.to_string(),
            bio: None,
            link: None,
            profile_image: None,
            cover_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_account(&account).await.unwrap();
        account.id
    }

    #[tokio::test]
    async fn list_attaches_sender_and_marks_read() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        let log = NotificationLog::new(db.clone());

        log.record(Notification::new(
            alice.clone(),
            bob.clone(),
            NotificationType::Follow,
        ))
        .await
        .unwrap();
        assert_eq!(log.unread_count(&bob).await.unwrap(), 1);

        let listed = log.list(&bob).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].from.username, "alice");
        assert_eq!(listed[0].notification_type, "follow");
        assert!(!listed[0].read);

        assert_eq!(log.unread_count(&bob).await.unwrap(), 0);
        assert!(log.list(&bob).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn delete_is_limited_to_the_recipient() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        let log = NotificationLog::new(db.clone());

        let notification = Notification::new(alice.clone(), bob.clone(), NotificationType::Like);
        let id = notification.id.clone();
        log.record(notification).await.unwrap();

        assert!(matches!(
            log.delete(&alice, &id).await,
            Err(AppError::Unauthorized(_))
        ));
        log.delete(&bob, &id).await.unwrap();
        assert!(matches!(
            log.delete(&bob, &id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn clear_removes_only_recipient_notifications() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        let log = NotificationLog::new(db.clone());

        log.record(Notification::new(alice.clone(), bob.clone(), NotificationType::Like))
            .await
            .unwrap();
        log.record(Notification::new(bob.clone(), alice.clone(), NotificationType::Follow))
            .await
            .unwrap();

        assert_eq!(log.clear(&bob).await.unwrap(), 1);
        assert!(log.list(&bob).await.unwrap().is_empty());
        assert_eq!(log.list(&alice).await.unwrap().len(), 1);
    }
}
