//! Application services: the imperative shell around the aggregates.

pub mod analytics;
pub mod bids;
pub mod engine;
pub mod images;
pub mod orders;
pub mod services;

pub use analytics::MonthlyRevenue;
pub use bids::{BidDesk, OfferResponse};
pub use engine::OrderEngine;
pub use images::{ImageStore, ImageUpload, InMemoryImageStore, LocalImageStore};
pub use orders::OrderDesk;
pub use services::Services;
