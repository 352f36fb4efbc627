//! Common library for the barbería web client
//!
//! This crate provides shared functionality used by the session core:
//! environment-driven configuration and the error taxonomies for the
//! authentication and request-pipeline layers.

pub mod config;
pub mod error;

pub use config::{AppConfig, IdentityConfig};
pub use error::{ApiError, ApiResult, AuthError, AuthResult};
