//! Role-scoped access tokens.
//!
//! Tokens are HS256 JWTs with claims `{sub, role, exp}`. Each role signs with
//! its own secret, so verification first reads the claimed role from the
//! unverified payload to pick the key, then verifies signature and expiry
//! with that key alone.

use crate::error::{MarketError, MarketResult};
use crate::notifications::RoomKey;
use crate::types::{AccountId, Role};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// JWT claims. `sub` is the only identity claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    /// Role the token was issued for
    pub role: Role,
    /// Expiry, seconds since the epoch
    pub exp: u64,
}

/// A verified caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Account id from `sub`
    pub account: AccountId,
    /// Role from the token
    pub role: Role,
}

impl Identity {
    /// The one room this caller's socket joins
    #[must_use]
    pub fn room_key(&self) -> RoomKey {
        RoomKey::new(self.role, &self.account)
    }
}

#[derive(Deserialize)]
struct RoleHint {
    role: Role,
}

/// Signing secrets, one per role.
#[derive(Clone)]
pub struct TokenKeys {
    buyer: String,
    seller: String,
    lender: String,
    ttl: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Creates a new `TokenKeys`
    #[must_use]
    pub fn new(
        buyer: impl Into<String>,
        seller: impl Into<String>,
        lender: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            buyer: buyer.into(),
            seller: seller.into(),
            lender: lender.into(),
            ttl,
        }
    }

    fn secret(&self, role: Role) -> &[u8] {
        match role {
            Role::Buyer => self.buyer.as_bytes(),
            Role::Seller => self.seller.as_bytes(),
            Role::Lender => self.lender.as_bytes(),
        }
    }

    /// Issue a token for `account` acting as `role`.
    ///
    /// Expiry is measured from the wall clock, which is what verification
    /// checks against.
    ///
    /// # Errors
    ///
    /// [`MarketError::Internal`] if signing fails.
    pub fn issue(&self, account: &AccountId, role: Role) -> MarketResult<String> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        let claims = Claims {
            sub: account.as_str().to_string(),
            role,
            exp: now + self.ttl.as_secs(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret(role)))
            .map_err(|e| MarketError::Internal(format!("token signing failed: {e}")))
    }

    /// Verify a token and return its caller.
    ///
    /// # Errors
    ///
    /// [`MarketError::Unauthorized`] for malformed, forged or expired tokens.
    pub fn verify(&self, token: &str) -> MarketResult<Identity> {
        let claimed = Self::claimed_role(token)
            .ok_or_else(|| MarketError::Unauthorized("Malformed token".to_string()))?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(claimed)),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, role = %claimed, "Token rejected");
            MarketError::Unauthorized("Invalid or expired token".to_string())
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(MarketError::Unauthorized("Token has no subject".to_string()));
        }

        Ok(Identity {
            account: AccountId::new(data.claims.sub),
            role: data.claims.role,
        })
    }

    /// Role claimed by the unverified payload
    fn claimed_role(token: &str) -> Option<Role> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice::<RoleHint>(&bytes).ok().map(|hint| hint.role)
    }
}
