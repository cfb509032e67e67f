//! HTTP request handlers.
//!
//! Generic handlers shared by every LibriX service.

pub mod health;
pub mod websocket;

// Re-export common handler utilities
pub use health::{health_check, HealthCheck, HealthReport, HealthStatus};
pub use websocket::serve_room;
