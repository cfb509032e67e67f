//! HTTP API endpoints.
//!
//! - `/api/orders` - purchases, seller actions and buyer/seller inboxes
//! - `/api/rent-orders` - rentals, lender actions, returns and analytics
//! - `/api/bids` - bid requests and offers
//! - `/ws` - real-time notification channel
//!
//! Every body is camelCase JSON with a `success` flag. Errors render through
//! [`librix_web::AppError`].

pub mod bids;
pub mod orders;
pub mod rent_orders;
pub mod websocket;

use crate::aggregates::order::Order;
use crate::notifications::Notification;
use crate::types::{Decision, OrderId};
use axum::extract::rejection::JsonRejection;
use axum::Json;
use librix_web::AppError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Shared Request/Response Types
// ============================================================================

/// Accept or decline an order.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderActionRequest {
    /// Order to answer
    pub order_id: Option<OrderId>,
    /// `accept` or `decline`
    pub action: Option<Decision>,
}

impl OrderActionRequest {
    /// Both fields, or a 400.
    ///
    /// # Errors
    ///
    /// [`AppError::bad_request`] when a field is missing.
    pub fn required(self) -> Result<(OrderId, Decision), AppError> {
        match (self.order_id, self.action) {
            (Some(order_id), Some(action)) => Ok((order_id, action)),
            _ => Err(AppError::bad_request("orderId and action are required")),
        }
    }
}

/// `{success, message}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Always `true`
    pub success: bool,
    /// What happened
    pub message: String,
}

impl MessageResponse {
    /// Successful response with `message`.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// `{success, orders}`
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    /// Always `true`
    pub success: bool,
    /// Orders, newest first
    pub orders: Vec<Order>,
}

/// `{success, notifications}`
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    /// Always `true`
    pub success: bool,
    /// Notifications, newest first
    pub notifications: Vec<Notification>,
}

/// Unwrap a JSON body, turning extractor rejections into a 400 with the
/// standard error body.
///
/// # Errors
///
/// [`AppError::bad_request`] carrying the rejection text.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Confirmation text for an answered order.
#[must_use]
pub const fn order_action_message(decision: Decision) -> &'static str {
    match decision {
        Decision::Accept => "Order accepted successfully",
        Decision::Decline => "Order declined successfully",
    }
}
