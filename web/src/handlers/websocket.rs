//! WebSocket connection pump for room subscriptions.
//!
//! Authentication and room selection happen before the upgrade (they are
//! application concerns). Once a connection knows its room, [`serve_room`]
//! owns the socket for its lifetime:
//!
//! ```text
//! RoomHub ──publish──> broadcast rx ──JSON text──> client
//!                                   <──ping/pong── every 30s
//! client ──close──> both halves stop, room released
//! ```
//!
//! Client → server frames carry no commands; anything other than close,
//! ping or pong is logged and ignored.

use crate::rooms::RoomHub;
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::StreamExt, SinkExt};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Ping interval for keep-alive (30 seconds).
pub const PING_INTERVAL_SECS: u64 = 30;

/// Process-wide count of open room connections.
static ACTIVE_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

/// Currently open room connections.
#[must_use]
pub fn active_connections() -> usize {
    ACTIVE_CONNECTIONS.load(Ordering::Relaxed)
}

struct ConnectionGuard;

impl ConnectionGuard {
    #[allow(clippy::cast_precision_loss)]
    fn open() -> Self {
        let now = ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("websocket.connections").set(now as f64);
        Self
    }
}

impl Drop for ConnectionGuard {
    #[allow(clippy::cast_precision_loss)]
    fn drop(&mut self) {
        let now = ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        metrics::gauge!("websocket.connections").set(now as f64);
    }
}

/// Stream every message published to `room` to this socket until either side
/// closes.
///
/// The connection joins the room exactly once, before the first message is
/// forwarded, and releases it on exit.
pub async fn serve_room<M>(socket: WebSocket, hub: RoomHub<M>, room: String)
where
    M: Serialize + Clone + Send + Sync + 'static,
{
    let _guard = ConnectionGuard::open();
    info!(room = %room, "WebSocket joined room");

    let (mut sender, mut receiver) = socket.split();
    let mut room_rx = hub.join(room.clone()).await;

    let send_room = room.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ping = interval(Duration::from_secs(PING_INTERVAL_SECS));
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ping.tick().await;

        loop {
            tokio::select! {
                received = room_rx.recv() => {
                    let message = match received {
                        Ok(message) => message,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(room = %send_room, skipped, "WebSocket receiver lagged");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let text = match serde_json::to_string(&message) {
                        Ok(json) => json,
                        Err(e) => {
                            error!(error = %e, "Failed to serialize room message");
                            continue;
                        }
                    };

                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("WebSocket send task terminated");
    });

    let recv_room = room.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => {
                    debug!(room = %recv_room, "Client requested close");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Text(_) | Message::Binary(_) => {
                    warn!(room = %recv_room, "Ignoring client frame on push-only socket");
                }
            }
        }

        debug!("WebSocket receive task terminated");
    });

    // Wait for the aborted half so its room receiver is dropped before release.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            let _ = recv_task.await;
        },
        _ = (&mut recv_task) => {
            send_task.abort();
            let _ = send_task.await;
        },
    }
    hub.release(&room).await;

    info!(room = %room, "WebSocket left room");
}
