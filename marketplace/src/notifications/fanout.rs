//! Real-time push to `"<role>_<id>"` rooms.
//!
//! Push is best effort: a room with no open connection drops the message, and
//! the stored notification stays readable through the list endpoints.

use super::model::Notification;
use crate::types::{AccountId, Role};
use async_trait::async_trait;
use librix_web::RoomHub;
use serde::{Serialize, Serializer};
use std::fmt;

/// Event name on every server frame.
pub const NOTIFICATION_EVENT: &str = "new_notification";

/// Room a connection joins: `"<role>_<id>"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomKey(String);

impl RoomKey {
    /// Room of `account` acting as `role`
    #[must_use]
    pub fn new(role: Role, account: &AccountId) -> Self {
        Self(format!("{role}_{account}"))
    }

    /// Room name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A server frame.
///
/// Serialises as `{"event":"new_notification","data":<notification>|null}`;
/// `null` tells the client to refetch its lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Push {
    /// A freshly stored notification
    Notification(Box<Notification>),
    /// Payload-less refresh signal
    Refresh,
}

#[derive(Serialize)]
struct Frame<'a> {
    event: &'static str,
    data: Option<&'a Notification>,
}

impl Serialize for Push {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = match self {
            Self::Notification(notification) => Some(notification.as_ref()),
            Self::Refresh => None,
        };
        Frame {
            event: NOTIFICATION_EVENT,
            data,
        }
        .serialize(serializer)
    }
}

/// Delivers frames to rooms.
#[async_trait]
pub trait FanOut: Send + Sync {
    /// Push `push` to every connection in `room`; returns how many got it
    async fn publish(&self, room: &RoomKey, push: Push) -> usize;
}

/// [`FanOut`] over the WebSocket room hub.
#[derive(Clone, Default)]
pub struct RoomFanOut {
    hub: RoomHub<Push>,
}

impl RoomFanOut {
    /// Publish through `hub`
    #[must_use]
    pub const fn new(hub: RoomHub<Push>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl FanOut for RoomFanOut {
    async fn publish(&self, room: &RoomKey, push: Push) -> usize {
        self.hub.publish(room.as_str(), push).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_room_key_format() {
        assert_eq!(RoomKey::new(Role::Seller, &AccountId::new("42")).as_str(), "seller_42");
        assert_eq!(RoomKey::new(Role::Lender, &AccountId::new("abc")).to_string(), "lender_abc");
    }

    #[test]
    fn test_refresh_frame_has_null_data() {
        let json = serde_json::to_value(Push::Refresh).unwrap();
        assert_eq!(json, serde_json::json!({"event": "new_notification", "data": null}));
    }

    #[tokio::test]
    async fn test_publish_reaches_joined_room_only() {
        let hub = RoomHub::new();
        let fanout = RoomFanOut::new(hub.clone());
        let buyer = RoomKey::new(Role::Buyer, &AccountId::new("b1"));

        assert_eq!(fanout.publish(&buyer, Push::Refresh).await, 0);

        let mut rx = hub.join(buyer.as_str()).await;
        assert_eq!(fanout.publish(&buyer, Push::Refresh).await, 1);
        assert_eq!(rx.recv().await.unwrap(), Push::Refresh);
    }
}
