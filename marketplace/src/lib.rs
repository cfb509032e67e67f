//! # LibriX Marketplace
//!
//! Backend for a used-book marketplace where buyers purchase, rent, or ask
//! sellers to bid on books.
//!
//! ## Architecture
//!
//! - **Aggregates**: [`aggregates::order::OrderReducer`] is the single state
//!   machine for purchases, rentals and bid-fulfilled orders
//! - **Lifecycle**: accepted orders move to dispatch and delivery on durable
//!   timers run by [`librix_runtime::EffectRunner`]
//! - **Notifications**: stored first, then pushed to `"<role>_<id>"` rooms
//! - **Store**: repository traits with an in-memory implementation
//! - **Web**: Axum handlers under `/api`, a WebSocket channel at `/ws`
//!
//! ```text
//! pending ──accept──▶ accepted ──(5m)──▶ out_for_delivery ──(5m)──▶ delivered ──▶ returned
//!    └──decline──▶ cancelled                                                     (rentals)
//! ```

pub mod aggregates;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod server;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{MarketError, MarketResult};
pub use types::*;
