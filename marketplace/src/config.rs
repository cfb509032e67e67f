//! Configuration management for the marketplace.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file is read by the binary before [`Config::from_env`] runs.

use crate::auth::TokenKeys;
use crate::lifecycle::{LifecycleTimings, DEFAULT_STEP_DELAY};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Access token configuration
    pub auth: AuthConfig,
    /// Delivery sequence timing
    pub lifecycle: LifecycleConfig,
    /// Catalog seed and upload locations
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter (tracing `EnvFilter` syntax)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// Start the Prometheus listener
    pub metrics_enabled: bool,
    /// Prometheus listener port
    pub metrics_port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_allowed_origins: Vec<String>,
}

/// Access token configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret for buyer tokens
    pub buyer_secret: String,
    /// Secret for seller tokens
    pub seller_secret: String,
    /// Secret for lender tokens
    pub lender_secret: String,
    /// Lifetime of issued tokens in seconds (default: 1 day)
    pub token_ttl: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

/// Delivery sequence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds between accept and dispatch, and between dispatch and delivery
    pub step_secs: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file with books to list at startup
    pub catalog_path: Option<PathBuf>,
    /// Directory for offer images
    pub upload_dir: PathBuf,
    /// URL prefix under which `upload_dir` is served
    pub upload_public_base: String,
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed("PORT", 8080),
                log_level: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "info,marketplace=debug,tower_http=info".to_string()),
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT", 30),
                metrics_enabled: parsed("METRICS_ENABLED", false),
                metrics_port: parsed("METRICS_PORT", 9090),
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            auth: AuthConfig {
                buyer_secret: env::var("BUYER_ACCESS_TOKEN_SECRET")
                    .unwrap_or_else(|_| "dev-buyer-secret-change-in-production".to_string()),
                seller_secret: env::var("SELLER_ACCESS_TOKEN_SECRET")
                    .unwrap_or_else(|_| "dev-seller-secret-change-in-production".to_string()),
                lender_secret: env::var("LENDER_ACCESS_TOKEN_SECRET")
                    .unwrap_or_else(|_| "dev-lender-secret-change-in-production".to_string()),
                token_ttl: parsed("ACCESS_TOKEN_TTL", 86_400), // 1 day
            },
            lifecycle: LifecycleConfig {
                step_secs: parsed("LIFECYCLE_STEP_SECS", DEFAULT_STEP_DELAY.as_secs()),
            },
            storage: StorageConfig {
                catalog_path: env::var("CATALOG_PATH").ok().map(PathBuf::from),
                upload_dir: env::var("UPLOAD_DIR")
                    .map_or_else(|_| PathBuf::from("uploads"), PathBuf::from),
                upload_public_base: env::var("UPLOAD_PUBLIC_BASE")
                    .unwrap_or_else(|_| "/uploads".to_string()),
            },
        }
    }

    /// Socket address string the HTTP server binds to
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Token keys for the three roles
    #[must_use]
    pub fn token_keys(&self) -> TokenKeys {
        TokenKeys::new(
            self.auth.buyer_secret.clone(),
            self.auth.seller_secret.clone(),
            self.auth.lender_secret.clone(),
            Duration::from_secs(self.auth.token_ttl),
        )
    }

    /// Step delays for the delivery sequence
    #[must_use]
    pub const fn lifecycle_timings(&self) -> LifecycleTimings {
        LifecycleTimings::from_step_secs(self.lifecycle.step_secs)
    }

    /// Graceful shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }
}
