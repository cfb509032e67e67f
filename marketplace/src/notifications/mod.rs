//! Notifications: stored records, their texts, and real-time push.

pub mod fanout;
pub mod model;
pub mod notifier;
pub mod templates;

pub use fanout::{FanOut, Push, RoomFanOut, RoomKey};
pub use model::{Notification, NotificationDraft, NotificationKind, SnapshotStatus};
pub use notifier::Notifier;
