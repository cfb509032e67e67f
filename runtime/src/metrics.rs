//! Prometheus metrics for observability and monitoring.
//!
//! Metric names used across the workspace are described here so the
//! exporter can render help text for them:
//! - Effect runner timers
//! - Order placement and transitions
//! - Lifecycle steps
//! - Notification persistence and push
//!
//! # Example
//!
//! ```rust,no_run
//! use librix_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build or install the Prometheus exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started: false,
        }
    }

    /// Whether the exporter has been installed by this server.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Install the global recorder and start the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if the listener cannot be set up.
    /// A recorder that is already installed is logged and tolerated.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        match PrometheusBuilder::new().with_http_listener(self.addr).install() {
            Ok(()) => {
                register_metrics();
                self.started = true;
                tracing::info!(
                    addr = %self.addr,
                    "Metrics server started - available at http://{}/metrics",
                    self.addr
                );
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Effect runner
    describe_counter!("runner.effects.executed", "Effects executed, labelled by type");
    describe_counter!("runner.timers.fired", "Delayed actions that fired");
    describe_counter!("runner.timers.abandoned", "Delayed actions dropped by shutdown");

    // Orders
    describe_counter!("orders.placed", "Orders created, labelled by kind");
    describe_counter!("orders.transitions", "Order status transitions, labelled by target status");
    describe_counter!("orders.rejected", "Commands rejected by the order state machine");

    // Lifecycle
    describe_counter!("lifecycle.steps", "Lifecycle steps applied, labelled by step");
    describe_counter!("lifecycle.aborted", "Lifecycle steps aborted because the order diverged");
    describe_counter!("lifecycle.recovered", "Pending lifecycle jobs re-armed at startup");

    // Notifications
    describe_counter!("notifications.created", "Notifications persisted, labelled by type");
    describe_counter!("notifications.pushed", "Notifications delivered to at least one socket");
    describe_counter!("notifications.dropped", "Pushes with no connected socket in the room");
    describe_gauge!("websocket.connections", "Currently open WebSocket connections");
}
