//! Application state for the marketplace HTTP server.

use crate::app::Services;
use crate::auth::TokenKeys;
use crate::notifications::Push;
use axum::extract::FromRef;
use librix_web::RoomHub;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared by all handlers; cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Marketplace services
    pub services: Arc<Services>,
    /// Token verification keys
    pub keys: Arc<TokenKeys>,
    /// WebSocket rooms
    pub hub: RoomHub<Push>,
    /// Directory served under `/uploads`
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        services: Arc<Services>,
        keys: Arc<TokenKeys>,
        hub: RoomHub<Push>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            services,
            keys,
            hub,
            upload_dir: upload_dir.into(),
        }
    }
}

// Lets the role-gated extractors reach the token keys.
impl FromRef<AppState> for Arc<TokenKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
