//! Stored notification records.

use crate::aggregates::bid::OfferStatus;
use crate::types::{AccountId, NotificationId, OrderStatus, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a notification is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone asks the recipient to accept or decline
    OrderRequest,
    /// Progress on the recipient's order or offer
    OrderUpdate,
    /// Money received
    Payment,
}

/// Status snapshot shown next to a request notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotStatus {
    /// Snapshot of an order
    Order(OrderStatus),
    /// Snapshot of an offer
    Offer(OfferStatus),
}

/// A message to one recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification id
    pub id: NotificationId,
    /// Recipient account
    pub recipient: AccountId,
    /// Role the recipient acts in
    pub recipient_role: Role,
    /// Short headline
    pub title: String,
    /// Body text, interpolated at creation
    pub message: String,
    /// Kind
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Order or offer this refers to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order_ref: Option<Uuid>,
    /// Status snapshot, patched in place on request notifications
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order_status: Option<SnapshotStatus>,
    /// Photo attached to offer notifications
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    /// Read flag
    pub is_read: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Materialise a draft
    #[must_use]
    pub fn from_draft(draft: NotificationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: draft.recipient,
            recipient_role: draft.recipient_role,
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            order_ref: draft.order_ref,
            order_status: draft.order_status,
            image_url: draft.image_url,
            is_read: false,
            created_at: now,
        }
    }

    /// Whether this is the request notification for `reference`
    #[must_use]
    pub fn is_request_for(&self, reference: Uuid) -> bool {
        self.kind == NotificationKind::OrderRequest && self.order_ref == Some(reference)
    }
}

/// A notification before it has an id and a timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationDraft {
    /// Recipient account
    pub recipient: AccountId,
    /// Role the recipient acts in
    pub recipient_role: Role,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Kind
    pub kind: NotificationKind,
    /// Order or offer this refers to
    pub order_ref: Option<Uuid>,
    /// Status snapshot
    pub order_status: Option<SnapshotStatus>,
    /// Attached photo
    pub image_url: Option<String>,
}
