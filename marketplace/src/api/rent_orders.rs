//! Rental order endpoints.
//!
//! - POST /api/rent-orders/rent - Rent a book for some weeks (buyer)
//! - POST /api/rent-orders/mark-returned - Close a delivered rental (lender)
//! - GET /api/rent-orders/lender/orders - Rentals addressed to the lender (lender)
//! - GET /api/rent-orders/lender/notifications - Lender inbox (lender)
//! - GET /api/rent-orders/lender/analytics - Six months of revenue (lender)

use super::{json_body, NotificationsResponse, OrdersResponse};
use crate::aggregates::order::Order;
use crate::app::MonthlyRevenue;
use crate::auth::{BuyerAuth, LenderAuth};
use crate::server::state::AppState;
use crate::types::{LendBookId, OrderId, Role};
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

/// Request to rent a book.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RentRequest {
    /// Book listed for rent
    pub book_id: Option<LendBookId>,
    /// Rental length in weeks, at least one
    pub duration_weeks: Option<u32>,
}

/// Request to mark a rental returned.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkReturnedRequest {
    /// Delivered rental
    pub order_id: Option<OrderId>,
}

/// `{success, order}`
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Always `true`
    pub success: bool,
    /// The order after the operation
    pub order: Order,
}

/// `{success, revenueData}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    /// Always `true`
    pub success: bool,
    /// Six months, oldest first
    pub revenue_data: Vec<MonthlyRevenue>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Place a rental order.
///
/// `amount` is the weekly price times `durationWeeks`; the due date is that
/// many weeks from now. The rental is accepted on placement and goes out for
/// delivery without a lender answer.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/rent-orders/rent \
///   -H "Authorization: Bearer <buyer_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"bookId": "550e8400-e29b-41d4-a716-446655440000", "durationWeeks": 3}'
/// ```
///
/// Response (201):
/// ```json
/// { "success": true, "order": { "orderType": "rental", "status": "accepted", "amount": 150, ... } }
/// ```
pub async fn rent(
    auth: BuyerAuth,
    State(state): State<AppState>,
    payload: Result<Json<RentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let request = json_body(payload)?;
    let (Some(book_id), Some(weeks)) = (request.book_id, request.duration_weeks) else {
        return Err(AppError::bad_request("bookId and durationWeeks are required"));
    };

    let order = state
        .services
        .orders
        .place_rental(auth.identity.account, book_id, weeks)
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse { success: true, order })))
}

/// Mark a delivered rental as returned.
///
/// Only the lender of record may do this, and only once the book was
/// delivered; anything else is a 409.
pub async fn mark_returned(
    auth: LenderAuth,
    State(state): State<AppState>,
    payload: Result<Json<MarkReturnedRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let order_id = json_body(payload)?
        .order_id
        .ok_or_else(|| AppError::bad_request("orderId is required"))?;

    let order = state
        .services
        .orders
        .mark_returned(order_id, auth.identity.account)
        .await?;

    Ok(Json(OrderResponse { success: true, order }))
}

/// Rentals addressed to the calling lender, newest first.
pub async fn lender_orders(
    auth: LenderAuth,
    State(state): State<AppState>,
) -> Result<Json<OrdersResponse>, AppError> {
    let orders = state
        .services
        .orders
        .counterparty_orders(&auth.identity.account, Role::Lender)
        .await?;
    Ok(Json(OrdersResponse { success: true, orders }))
}

/// Lender inbox, newest first.
pub async fn lender_notifications(
    auth: LenderAuth,
    State(state): State<AppState>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let notifications = state
        .services
        .notifications(&auth.identity.account, Role::Lender)
        .await?;
    Ok(Json(NotificationsResponse {
        success: true,
        notifications,
    }))
}

/// Revenue over the trailing six calendar months.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/rent-orders/lender/analytics -H "Authorization: Bearer <lender_token>"
/// ```
///
/// Response:
/// ```json
/// {
///   "success": true,
///   "revenueData": [
///     { "month": "May", "revenue": 0 },
///     { "month": "Jun", "revenue": 0 },
///     { "month": "Jul", "revenue": 80 },
///     { "month": "Aug", "revenue": 0 },
///     { "month": "Sep", "revenue": 0 },
///     { "month": "Oct", "revenue": 150 }
///   ]
/// }
/// ```
pub async fn lender_analytics(
    auth: LenderAuth,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let revenue_data = state.services.lender_analytics(&auth.identity.account).await?;
    Ok(Json(AnalyticsResponse {
        success: true,
        revenue_data,
    }))
}
