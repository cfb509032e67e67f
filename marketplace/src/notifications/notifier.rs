//! Store-then-push notification delivery.

use super::fanout::{FanOut, Push, RoomKey};
use super::model::{Notification, NotificationDraft, SnapshotStatus};
use crate::error::MarketResult;
use crate::store::NotificationRepository;
use crate::types::{AccountId, Role};
use librix_core::environment::Clock;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Persists notifications and pushes them to the recipient's room.
///
/// The store write happens first, so a failed or dropped push never loses a
/// notification.
#[derive(Clone)]
pub struct Notifier {
    repo: Arc<dyn NotificationRepository>,
    fanout: Arc<dyn FanOut>,
    clock: Arc<dyn Clock>,
}

impl Notifier {
    /// Creates a new `Notifier`
    #[must_use]
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        fanout: Arc<dyn FanOut>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            fanout,
            clock,
        }
    }

    /// Store a notification and push it.
    ///
    /// # Errors
    ///
    /// Returns the store error if the notification could not be saved. Push
    /// failures are not errors.
    pub async fn notify(&self, draft: NotificationDraft) -> MarketResult<Notification> {
        let notification = Notification::from_draft(draft, self.clock.now());
        self.repo.insert(notification.clone()).await?;
        metrics::counter!("notifications.created").increment(1);

        let room = RoomKey::new(notification.recipient_role, &notification.recipient);
        let delivered = self
            .fanout
            .publish(&room, Push::Notification(Box::new(notification.clone())))
            .await;

        if delivered == 0 {
            metrics::counter!("notifications.dropped").increment(1);
            debug!(%room, title = %notification.title, "No listener in room, push dropped");
        } else {
            metrics::counter!("notifications.pushed").increment(1);
            debug!(%room, delivered, title = %notification.title, "Notification pushed");
        }

        Ok(notification)
    }

    /// Notifications for `recipient` acting as `role`, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn inbox(&self, recipient: &AccountId, role: Role) -> MarketResult<Vec<Notification>> {
        self.repo.list_for(recipient, role).await
    }

    /// Tell a room to refetch its lists.
    pub async fn nudge(&self, room: &RoomKey) {
        let delivered = self.fanout.publish(room, Push::Refresh).await;
        debug!(%room, delivered, "Refresh nudge sent");
    }

    /// Patch the request notification for `reference` to show `status`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the patch could not be saved.
    pub async fn settle_request(&self, reference: Uuid, status: SnapshotStatus) -> MarketResult<()> {
        match self.repo.settle_request(reference, status).await? {
            Some(notification) => {
                info!(%reference, id = %notification.id, ?status, "Request notification settled");
            },
            None => debug!(%reference, "No request notification to settle"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notifications::fanout::RoomFanOut;
    use crate::notifications::model::NotificationKind;
    use crate::store::InMemoryStore;
    use crate::types::OrderStatus;
    use librix_testing::test_clock;
    use librix_web::RoomHub;

    fn draft(reference: Uuid) -> NotificationDraft {
        NotificationDraft {
            recipient: AccountId::new("s1"),
            recipient_role: Role::Seller,
            title: "New Order Received".into(),
            message: "New order".into(),
            kind: NotificationKind::OrderRequest,
            order_ref: Some(reference),
            order_status: Some(SnapshotStatus::Order(OrderStatus::Pending)),
            image_url: None,
        }
    }

    fn notifier(store: &Arc<InMemoryStore>, hub: &RoomHub<Push>) -> Notifier {
        Notifier::new(
            store.clone(),
            Arc::new(RoomFanOut::new(hub.clone())),
            Arc::new(test_clock()),
        )
    }

    #[tokio::test]
    async fn test_notification_is_stored_without_listener() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = notifier(&store, &RoomHub::new());

        notifier.notify(draft(Uuid::new_v4())).await.unwrap();

        let listed = store.list_for(&AccountId::new("s1"), Role::Seller).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_notification_is_pushed_to_recipient_room() {
        let store = Arc::new(InMemoryStore::new());
        let hub = RoomHub::new();
        let mut rx = hub.join("seller_s1").await;
        let notifier = notifier(&store, &hub);

        let stored = notifier.notify(draft(Uuid::new_v4())).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Push::Notification(Box::new(stored)));
    }

    #[tokio::test]
    async fn test_settle_patches_in_place() {
        let store = Arc::new(InMemoryStore::new());
        let notifier = notifier(&store, &RoomHub::new());
        let reference = Uuid::new_v4();
        notifier.notify(draft(reference)).await.unwrap();

        notifier
            .settle_request(reference, SnapshotStatus::Order(OrderStatus::Accepted))
            .await
            .unwrap();

        let listed = store.list_for(&AccountId::new("s1"), Role::Seller).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].order_status,
            Some(SnapshotStatus::Order(OrderStatus::Accepted))
        );
    }
}
