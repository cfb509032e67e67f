//! Axum web framework integration for LibriX.
//!
//! This crate holds the HTTP plumbing the marketplace service is built on,
//! following the "Functional Core, Imperative Shell" split.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, WebSocket rooms
//! │  - Request parsing                      │  ← CORS, tracing
//! │  - Response serialization               │  ← Correlation ids
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Pure business logic (reducers)       │
//! │  - State transformations                │
//! │  - Effect descriptions (values)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from request (JSON, multipart, bearer token)
//! 3. **Call** the application service, which runs the reducer and its effects
//! 4. **Push** resulting notifications to WebSocket rooms via [`RoomHub`]
//! 5. **Map result** to HTTP response, or to an [`AppError`] envelope

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod rooms;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use rooms::RoomHub;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
