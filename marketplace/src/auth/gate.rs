//! Role-gated request extractors.
//!
//! ```rust,ignore
//! async fn seller_action(auth: SellerAuth, ...) -> Result<Json<...>, AppError> {
//!     // auth.identity.role is guaranteed to be Role::Seller
//! }
//! ```

use super::tokens::{Identity, TokenKeys};
use crate::types::Role;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use librix_web::{AppError, BearerToken};
use std::marker::PhantomData;
use std::sync::Arc;

/// Compile-time role requirement.
pub trait RoleGate: Send + Sync + 'static {
    /// Role a caller must hold
    const ROLE: Role;
}

/// Requires a buyer token
#[derive(Debug)]
pub struct BuyerGate;

/// Requires a seller token
#[derive(Debug)]
pub struct SellerGate;

/// Requires a lender token
#[derive(Debug)]
pub struct LenderGate;

impl RoleGate for BuyerGate {
    const ROLE: Role = Role::Buyer;
}

impl RoleGate for SellerGate {
    const ROLE: Role = Role::Seller;
}

impl RoleGate for LenderGate {
    const ROLE: Role = Role::Lender;
}

/// Caller verified to hold the role of `G`.
///
/// Missing or invalid token rejects with 401; a valid token for another role
/// rejects with 403.
#[derive(Debug)]
pub struct Authenticated<G> {
    /// Verified caller
    pub identity: Identity,
    _gate: PhantomData<G>,
}

/// Buyer-only extractor
pub type BuyerAuth = Authenticated<BuyerGate>;
/// Seller-only extractor
pub type SellerAuth = Authenticated<SellerGate>;
/// Lender-only extractor
pub type LenderAuth = Authenticated<LenderGate>;

#[async_trait]
impl<S, G> FromRequestParts<S> for Authenticated<G>
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
    G: RoleGate,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_headers(&parts.headers)?;
        let keys = Arc::<TokenKeys>::from_ref(state);
        let identity = keys.verify(&token)?;

        if identity.role != G::ROLE {
            return Err(AppError::forbidden(format!(
                "This action requires a {} account",
                G::ROLE
            )));
        }

        Ok(Self {
            identity,
            _gate: PhantomData,
        })
    }
}
