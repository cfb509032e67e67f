//! Bearer-token authentication with one secret per role.

pub mod gate;
pub mod tokens;

pub use gate::{Authenticated, BuyerAuth, LenderAuth, RoleGate, SellerAuth};
pub use tokens::{Claims, Identity, TokenKeys};
