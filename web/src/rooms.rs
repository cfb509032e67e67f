//! Room-addressed broadcast for WebSocket push.
//!
//! A room is a string key. Every connection that joined the room receives
//! every message published to it. Publishing to a room nobody has joined is a
//! no-op: there is no buffering for absent listeners.
//!
//! ```text
//! publish("seller_42", msg)
//!        │
//!        ▼
//!  ┌─────────────┐     ┌──────────────┐
//!  │ "seller_42" │ ──> │ connection A │
//!  │  broadcast  │ ──> │ connection B │
//!  └─────────────┘     └──────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Messages buffered per room before slow receivers start lagging.
const ROOM_CAPACITY: usize = 256;

/// Type alias for the rooms map to reduce complexity.
type RoomsMap<M> = Arc<RwLock<HashMap<String, broadcast::Sender<M>>>>;

/// Broadcast hub keyed by room name.
///
/// # Example
///
/// ```ignore
/// let hub = RoomHub::<Push>::new();
///
/// let mut rx = hub.join("buyer_7").await;
/// hub.publish("buyer_7", Push::Refresh).await;
/// assert!(rx.recv().await.is_ok());
/// ```
pub struct RoomHub<M>
where
    M: Clone + Send + 'static,
{
    rooms: RoomsMap<M>,
}

impl<M> RoomHub<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish a message to every connection in `room`.
    ///
    /// Returns how many connections received it. Zero means the room was empty
    /// and the message was dropped.
    pub async fn publish(&self, room: &str, message: M) -> usize {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .and_then(|sender| sender.send(message).ok())
            .unwrap_or(0)
    }

    /// Join `room`, creating it on first use.
    pub async fn join(&self, room: impl Into<String>) -> broadcast::Receiver<M> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.into())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Drop the room's channel if no connection is listening any more.
    ///
    /// Call after a connection's receiver has been dropped.
    pub async fn release(&self, room: &str) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(room).is_some_and(|sender| sender.receiver_count() == 0) {
            rooms.remove(room);
        }
    }

    /// Number of live connections in `room`.
    pub async fn occupancy(&self, room: &str) -> usize {
        self.rooms
            .read()
            .await
            .get(room)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of rooms with a channel.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl<M> Default for RoomHub<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for RoomHub<M>
where
    M: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            rooms: Arc::clone(&self.rooms),
        }
    }
}
