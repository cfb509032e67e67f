//! Real-time notification channel.
//!
//! # Connection
//!
//! ```text
//! ws://localhost:8080/ws?token=<access_token>
//! ```
//!
//! or with `Authorization: Bearer <access_token>` on the upgrade request.
//! The verified token decides the one room the connection joins,
//! `"<role>_<id>"`. There is no way to join another room later.
//!
//! # Message Format
//!
//! **Server → Client (new notification):**
//! ```json
//! { "event": "new_notification", "data": { "title": "Order Confirmed", ... } }
//! ```
//!
//! **Server → Client (refetch your lists):**
//! ```json
//! { "event": "new_notification", "data": null }
//! ```

use crate::auth::Identity;
use crate::server::state::AppState;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use librix_web::{handlers::serve_room, AppError, BearerToken};
use serde::Deserialize;

/// Query string of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Access token, for clients that cannot set headers
    pub token: Option<String>,
}

/// Verify the caller. The query token wins over the header when both are
/// present.
fn authenticate(state: &AppState, query: WsQuery, headers: &HeaderMap) -> Result<Identity, AppError> {
    let token = match query.token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => BearerToken::from_headers(headers)?.0,
    };
    Ok(state.keys.verify(&token)?)
}

/// Upgrade to a WebSocket bound to the caller's room.
///
/// The token is checked before the upgrade, so a bad token is a plain 401
/// and never reaches the socket layer.
pub async fn notifications_ws(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let identity = match authenticate(&state, query, &headers) {
        Ok(identity) => identity,
        Err(error) => return error.into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(account = %identity.account, %rejection, "Not a WebSocket upgrade");
            return rejection.into_response();
        },
    };

    let room = identity.room_key().to_string();
    tracing::debug!(%room, "WebSocket upgrade accepted");
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_room(socket, hub, room))
}
