//! Router configuration for the marketplace.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{bids, orders, rent_orders, websocket};
use axum::{
    routing::{get, post},
    Router,
};
use librix_web::{correlation_id_layer, handlers::health_check};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Configures:
/// - Health checks
/// - Purchase, rental and bid endpoints under `/api`
/// - The WebSocket notification channel
/// - Stored offer images under `/uploads`
///
/// CORS is left to the caller so tests can drive the bare router.
pub fn build_router(state: AppState) -> Router {
    let order_routes = Router::new()
        .route("/buy", post(orders::buy))
        .route("/seller-action", post(orders::seller_action))
        .route("/my-orders", get(orders::my_orders))
        .route("/seller/all-orders", get(orders::seller_orders))
        .route("/buyer/notifications", get(orders::buyer_notifications))
        .route("/seller/notifications", get(orders::seller_notifications));

    let rent_routes = Router::new()
        .route("/rent", post(rent_orders::rent))
        .route("/mark-returned", post(rent_orders::mark_returned))
        .route("/lender/orders", get(rent_orders::lender_orders))
        .route("/lender/notifications", get(rent_orders::lender_notifications))
        .route("/lender/analytics", get(rent_orders::lender_analytics));

    let bid_routes = Router::new()
        .route("/post-request", post(bids::post_request))
        .route("/all", get(bids::all_bids))
        .route("/my-accepted-offers", get(bids::my_accepted_offers))
        .route("/create-offer", post(bids::create_offer))
        .route("/respond-offer", post(bids::respond_offer));

    let api_routes = Router::new()
        .nest("/orders", order_routes)
        .nest("/rent-orders", rent_routes)
        .nest("/bids", bid_routes);

    let uploads = ServeDir::new(&state.upload_dir);

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/ws", get(websocket::notifications_ws))
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
