//! Configuration module for the web client core
//!
//! All configuration is supplied through environment variables at startup,
//! with development-friendly defaults.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Identity provider configuration (opaque credentials block)
///
/// These values are passed through to the identity provider SDK unchanged;
/// the session core never interprets them.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub app_id: String,
}

impl IdentityConfig {
    /// Create a new IdentityConfig from environment variables
    ///
    /// # Environment Variables
    /// - `IDENTITY_API_KEY`
    /// - `IDENTITY_AUTH_DOMAIN`
    /// - `IDENTITY_PROJECT_ID`
    /// - `IDENTITY_APP_ID`
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("IDENTITY_API_KEY").unwrap_or_default(),
            auth_domain: env::var("IDENTITY_AUTH_DOMAIN").unwrap_or_default(),
            project_id: env::var("IDENTITY_PROJECT_ID").unwrap_or_default(),
            app_id: env::var("IDENTITY_APP_ID").unwrap_or_default(),
        }
    }
}

/// Application configuration struct
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the REST backend
    pub api_base_url: String,
    /// Identity provider credentials block
    pub identity: IdentityConfig,
    /// Window during which a repeated identity assertion is not re-exchanged
    pub exchange_dedup_window: Duration,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `API_BASE_URL`: backend base URL (default: `http://localhost:8080`)
    /// - `SESSION_DEDUP_WINDOW_MS`: exchange dedup window in milliseconds
    ///   (default: 2000)
    pub fn from_env() -> Self {
        let api_base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let dedup_window_ms = match env::var("SESSION_DEDUP_WINDOW_MS") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!(
                    "invalid SESSION_DEDUP_WINDOW_MS value {:?}, using default",
                    value
                );
                2000
            }),
            Err(_) => 2000,
        };

        Self {
            api_base_url,
            identity: IdentityConfig::from_env(),
            exchange_dedup_window: Duration::from_millis(dedup_window_ms),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            identity: IdentityConfig::default(),
            exchange_dedup_window: Duration::from_millis(2000),
        }
    }
}
