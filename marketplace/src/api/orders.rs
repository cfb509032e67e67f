//! Purchase order endpoints.
//!
//! - POST /api/orders/buy - Buy a listed book (buyer)
//! - POST /api/orders/seller-action - Accept or decline an order (seller)
//! - GET /api/orders/my-orders - Every order of the buyer (buyer)
//! - GET /api/orders/seller/all-orders - Orders addressed to the seller (seller)
//! - GET /api/orders/buyer/notifications - Buyer inbox (buyer)
//! - GET /api/orders/seller/notifications - Seller inbox (seller)

use super::{
    json_body, order_action_message, MessageResponse, NotificationsResponse, OrderActionRequest,
    OrdersResponse,
};
use crate::aggregates::order::Order;
use crate::auth::{BuyerAuth, SellerAuth};
use crate::server::state::AppState;
use crate::types::{BookId, Role};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use librix_web::AppError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to buy a book.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyRequest {
    /// Listed book
    pub book_id: Option<BookId>,
}

/// Response after placing a purchase.
#[derive(Debug, Serialize)]
pub struct BuyResponse {
    /// Always `true`
    pub success: bool,
    /// Message for the buyer
    pub message: String,
    /// The pending order
    pub order: Order,
}

// ============================================================================
// Handlers
// ============================================================================

/// Place a purchase order.
///
/// The seller is notified and must accept before the delivery sequence starts.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/orders/buy \
///   -H "Authorization: Bearer <buyer_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"bookId": "550e8400-e29b-41d4-a716-446655440000"}'
/// ```
///
/// Response (201):
/// ```json
/// {
///   "success": true,
///   "message": "Order placed successfully",
///   "order": { "id": "...", "orderType": "purchase", "status": "pending", ... }
/// }
/// ```
pub async fn buy(
    auth: BuyerAuth,
    State(state): State<AppState>,
    payload: Result<Json<BuyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BuyResponse>), AppError> {
    let book_id = json_body(payload)?
        .book_id
        .ok_or_else(|| AppError::bad_request("bookId is required"))?;

    let order = state
        .services
        .orders
        .place_purchase(auth.identity.account, book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BuyResponse {
            success: true,
            message: "Order placed successfully".to_string(),
            order,
        }),
    ))
}

/// Accept or decline a pending order as its seller.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/orders/seller-action \
///   -H "Authorization: Bearer <seller_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"orderId": "660e8400-e29b-41d4-a716-446655440001", "action": "accept"}'
/// ```
///
/// Response:
/// ```json
/// { "success": true, "message": "Order accepted successfully" }
/// ```
///
/// A second answer to the same order is a 409.
pub async fn seller_action(
    auth: SellerAuth,
    State(state): State<AppState>,
    payload: Result<Json<OrderActionRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let (order_id, decision) = json_body(payload)?.required()?;

    state
        .services
        .orders
        .respond(order_id, decision, auth.identity.account, Role::Seller)
        .await?;

    Ok(Json(MessageResponse::ok(order_action_message(decision))))
}

/// Every order of the calling buyer, newest first.
///
/// Purchases, rentals and orders from accepted offers are all listed and
/// told apart by `orderType`.
///
/// ```bash
/// curl http://localhost:8080/api/orders/my-orders -H "Authorization: Bearer <buyer_token>"
/// ```
pub async fn my_orders(
    auth: BuyerAuth,
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>, AppError> {
    let orders = state.services.orders.buyer_orders(&auth.identity.account).await?;
    Ok(Json(OrdersResponse { success: true, orders }))
}

/// Orders addressed to the calling seller, newest first.
///
/// ```bash
/// curl http://localhost:8080/api/orders/seller/all-orders -H "Authorization: Bearer <seller_token>"
/// ```
pub async fn seller_orders(
    auth: SellerAuth,
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>, AppError> {
    let orders = state
        .services
        .orders
        .counterparty_orders(&auth.identity.account, Role::Seller)
        .await?;
    Ok(Json(OrdersResponse { success: true, orders }))
}

/// Buyer inbox, newest first.
///
/// ```bash
/// curl http://localhost:8080/api/orders/buyer/notifications -H "Authorization: Bearer <buyer_token>"
/// ```
pub async fn buyer_notifications(
    auth: BuyerAuth,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let notifications = state
        .services
        .notifications(&auth.identity.account, Role::Buyer)
        .await?;
    Ok(Json(NotificationsResponse {
        success: true,
        notifications,
    }))
}

/// Seller inbox, newest first.
pub async fn seller_notifications(
    auth: SellerAuth,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let notifications = state
        .services
        .notifications(&auth.identity.account, Role::Seller)
        .await?;
    Ok(Json(NotificationsResponse {
        success: true,
        notifications,
    }))
}
