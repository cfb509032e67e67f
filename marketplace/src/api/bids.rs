//! Reverse bidding endpoints.
//!
//! - POST /api/bids/post-request - Ask sellers for a book (buyer)
//! - GET /api/bids/all - Open bids (public)
//! - GET /api/bids/my-accepted-offers - Offers the buyer accepted (buyer)
//! - POST /api/bids/create-offer - Offer a copy with a photo, multipart (seller)
//! - POST /api/bids/respond-offer - Accept or decline an offer (buyer)
//!
//! # Flow
//!
//! ```text
//! buyer posts bid ─▶ sellers offer ─▶ buyer accepts one ─▶ order (accepted) ─▶ delivery
//!                                    └▶ buyer declines ─▶ seller notified
//! ```

use super::{json_body, MessageResponse};
use crate::aggregates::bid::{Bid, Offer, OfferTerms};
use crate::app::ImageUpload;
use crate::auth::{BuyerAuth, SellerAuth};
use crate::server::state::AppState;
use crate::types::{BidId, Decision, Money, OfferId};
use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use librix_web::AppError;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to post a bid.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostBidRequest {
    /// Wanted book
    pub book_name: String,
    /// Edition, budget, condition wishes
    pub comment: String,
}

/// Response after posting a bid.
#[derive(Debug, Serialize)]
pub struct PostBidResponse {
    /// Always `true`
    pub success: bool,
    /// Message for the buyer
    pub message: String,
    /// The open bid
    pub bid: Bid,
}

/// `{success, bids}`
#[derive(Debug, Serialize)]
pub struct BidsResponse {
    /// Always `true`
    pub success: bool,
    /// Open bids, newest first
    pub bids: Vec<Bid>,
}

/// `{success, offer}`
#[derive(Debug, Serialize)]
pub struct OfferResponse {
    /// Always `true`
    pub success: bool,
    /// The offer
    pub offer: Offer,
}

/// `{success, offers}`
#[derive(Debug, Serialize)]
pub struct OffersResponse {
    /// Always `true`
    pub success: bool,
    /// Accepted offers, most recently answered first
    pub offers: Vec<Offer>,
}

/// Request to answer an offer.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RespondOfferRequest {
    /// Offer to answer
    pub offer_id: Option<OfferId>,
    /// `accept` or `decline`
    pub action: Option<Decision>,
}

/// Multipart fields of an offer, collected before validation.
#[derive(Debug, Default)]
struct OfferForm {
    bid_id: Option<String>,
    price: Option<String>,
    condition: Option<String>,
    message: Option<String>,
    image: Option<ImageUpload>,
}

impl OfferForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "bidId" => form.bid_id = Some(text(field).await?),
                "price" => form.price = Some(text(field).await?),
                "condition" => form.condition = Some(text(field).await?),
                "message" => form.message = Some(text(field).await?),
                "image" => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::bad_request(e.body_text()))?;
                    form.image = Some(ImageUpload {
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                },
                other => tracing::debug!(field = other, "Ignoring unknown offer field"),
            }
        }
        Ok(form)
    }

    fn into_parts(self) -> Result<(BidId, OfferTerms, Option<ImageUpload>), AppError> {
        let (Some(bid_id), Some(price), Some(condition)) = (self.bid_id, self.price, self.condition)
        else {
            return Err(AppError::bad_request("bidId, price and condition are required"));
        };

        let bid_id = bid_id
            .trim()
            .parse::<BidId>()
            .map_err(|_| AppError::bad_request("bidId is not a valid id"))?;
        let price = price
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::bad_request("price must be a number"))
            .and_then(|rupees| Money::try_from_rupees_f64(rupees).map_err(AppError::validation))?;

        Ok((
            bid_id,
            OfferTerms {
                price,
                condition,
                message: self.message,
            },
            self.image,
        ))
    }
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(|e| AppError::bad_request(e.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// Post a bid request.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bids/post-request \
///   -H "Authorization: Bearer <buyer_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"bookName": "Godan", "comment": "Any edition under ₹300"}'
/// ```
///
/// Response (201):
/// ```json
/// { "success": true, "message": "Bid request posted successfully", "bid": { ... } }
/// ```
pub async fn post_request(
    auth: BuyerAuth,
    State(state): State<AppState>,
    payload: Result<Json<PostBidRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostBidResponse>), AppError> {
    let request = json_body(payload)?;

    let bid = state
        .services
        .bids
        .post_bid(auth.identity.account, &request.book_name, &request.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PostBidResponse {
            success: true,
            message: "Bid request posted successfully".to_string(),
            bid,
        }),
    ))
}

/// Open bids, newest first. No authentication.
pub async fn all_bids(State(state): State<AppState>) -> Result<Json<BidsResponse>, AppError> {
    let bids = state.services.bids.open_bids().await?;
    Ok(Json(BidsResponse { success: true, bids }))
}

/// Offers the calling buyer accepted.
pub async fn my_accepted_offers(
    auth: BuyerAuth,
    State(state): State<AppState>,
) -> Result<Json<OffersResponse>, AppError> {
    let offers = state.services.bids.accepted_offers(&auth.identity.account).await?;
    Ok(Json(OffersResponse { success: true, offers }))
}

/// Make an offer on an open bid.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bids/create-offer \
///   -H "Authorization: Bearer <seller_token>" \
///   -F bidId=770e8400-e29b-41d4-a716-446655440002 \
///   -F price=250 \
///   -F condition="Like new" \
///   -F message="Signed copy" \
///   -F image=@cover.jpg
/// ```
///
/// Response (201):
/// ```json
/// { "success": true, "offer": { "status": "pending", "imageUrl": "/uploads/....jpg", ... } }
/// ```
pub async fn create_offer(
    auth: SellerAuth,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<OfferResponse>), AppError> {
    let multipart = multipart.map_err(|e| AppError::bad_request(e.body_text()))?;
    let (bid_id, terms, image) = OfferForm::read(multipart).await?.into_parts()?;

    let offer = state
        .services
        .bids
        .create_offer(auth.identity.account, bid_id, terms, image)
        .await?;

    Ok((StatusCode::CREATED, Json(OfferResponse { success: true, offer })))
}

/// Accept or decline an offer on one of the buyer's bids.
///
/// Accepting creates an accepted order that goes straight into delivery.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bids/respond-offer \
///   -H "Authorization: Bearer <buyer_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"offerId": "880e8400-e29b-41d4-a716-446655440003", "action": "accept"}'
/// ```
pub async fn respond_offer(
    auth: BuyerAuth,
    State(state): State<AppState>,
    payload: Result<Json<RespondOfferRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let request = json_body(payload)?;
    let (Some(offer_id), Some(decision)) = (request.offer_id, request.action) else {
        return Err(AppError::bad_request("offerId and action are required"));
    };

    state
        .services
        .bids
        .respond_offer(auth.identity.account, offer_id, decision)
        .await?;

    let message = match decision {
        Decision::Accept => "Offer accepted successfully",
        Decision::Decline => "Offer declined successfully",
    };
    Ok(Json(MessageResponse::ok(message)))
}
