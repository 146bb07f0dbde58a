//! Notification dispatcher.
//!
//! Delivery is fire-and-forget: a failed write is logged and never fails the
//! operation that triggered it.

use std::sync::Arc;

use uuid::Uuid;

use common::{AppResult, MarketplaceConfig};
use domain::{Notification, NotificationKind, User};

use crate::infra::{ChangeKind, DocumentStore, Filter, Subscription};
use crate::repository::{Record, Records};
use crate::service::retry::retry_stale;

pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
    notifications: Records<Notification>,
    users: Records<User>,
    max_write_attempts: u32,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &MarketplaceConfig) -> Self {
        Self {
            notifications: Records::new(store.clone()),
            users: Records::new(store.clone()),
            store,
            max_write_attempts: config.max_write_attempts,
        }
    }

    /// Record a message for `receiver_id`. Never fails.
    pub async fn notify(
        &self,
        receiver_id: Uuid,
        message: impl Into<String>,
        kind: NotificationKind,
        target_id: Option<Uuid>,
    ) {
        let notification = Notification::new(receiver_id, message, kind, target_id);

        if let Err(e) = self.notifications.insert(&notification).await {
            tracing::warn!(
                receiver_id = %receiver_id,
                error = %e,
                "Failed to deliver notification"
            );
        }
    }

    /// Notifications of a receiver, newest first
    pub async fn list_for(&self, receiver_id: Uuid) -> AppResult<Vec<Notification>> {
        let mut notifications = self.notifications.where_eq("receiverId", receiver_id).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    /// Delete every notification addressed to the actor. Returns how many were removed.
    pub async fn clear_all(&self, actor_id: Uuid) -> AppResult<usize> {
        self.users.require(actor_id).await?;

        retry_stale("clear_notifications", self.max_write_attempts, || async move {
            let owned = self
                .notifications
                .where_eq_versioned("receiverId", actor_id)
                .await?;
            let writes: Vec<_> = owned
                .iter()
                .map(Records::<Notification>::delete_write)
                .collect();
            let cleared = writes.len();

            self.store.commit(writes).await?;
            Ok(cleared)
        })
        .await
    }

    /// Live feed of new notifications for a receiver
    pub fn subscribe_for(&self, receiver_id: Uuid) -> NotificationFeed {
        NotificationFeed {
            inner: self
                .store
                .subscribe(Notification::COLLECTION, Filter::all().eq("receiverId", receiver_id)),
        }
    }
}

/// Stream of notifications delivered to one receiver
#[derive(Debug)]
pub struct NotificationFeed {
    inner: Subscription,
}

impl NotificationFeed {
    /// Next delivered notification, or `None` once the store is gone
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            let event = self.inner.next().await?;
            if event.kind != ChangeKind::Upserted {
                continue;
            }
            match serde_json::from_value(event.document.body) {
                Ok(notification) => return Some(notification),
                Err(e) => {
                    tracing::warn!(id = %event.id, error = %e, "Skipping unreadable notification");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::MockDocumentStore;
    use common::AppError;

    #[tokio::test]
    async fn notify_swallows_store_failures() {
        let mut store = MockDocumentStore::new();
        store
            .expect_commit()
            .times(1)
            .returning(|_| Err(AppError::internal("store offline")));

        let service = NotificationService::new(Arc::new(store), &MarketplaceConfig::default());

        // Completes without surfacing the failure
        service
            .notify(Uuid::new_v4(), "hello", NotificationKind::Info, None)
            .await;
    }
}
