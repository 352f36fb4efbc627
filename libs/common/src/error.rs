//! Custom error types for the common library
//!
//! This module defines the error taxonomies shared by the session core:
//! authentication-layer failures (credential exchange, silent refresh) and
//! generic request-pipeline failures.

use thiserror::Error;

/// Errors produced by the credential exchange and refresh flows.
///
/// `AuthError` is `Clone` so that a single outcome can be fanned out to
/// every caller waiting on the same in-flight exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity assertion was rejected by the backend (4xx other than
    /// 429). Retrying cannot help; the assertion itself is invalid or
    /// expired.
    #[error("authentication rejected by backend (status {status})")]
    Rejected { status: u16 },

    /// The backend was unavailable (5xx or 429) and the retry budget ran
    /// out.
    #[error("authentication backend unavailable (status {status})")]
    Upstream { status: u16 },

    /// The request never produced a response.
    #[error("network error during authentication: {0}")]
    Network(String),

    /// The exchange was cancelled by its caller (for example, the identity
    /// provider signed out mid-flight). Never surfaced to the user.
    #[error("credential exchange cancelled")]
    Cancelled,

    /// The backend answered 2xx but the payload did not carry a usable
    /// session.
    #[error("invalid authentication response: {0}")]
    InvalidResponse(String),
}

/// Type alias for Result with AuthError
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors produced by the authenticated request pipeline.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request returned 401 and the recovery cycle could not produce a
    /// new token (or was already spent for this request).
    #[error("request unauthorized")]
    Unauthorized,

    /// The request returned 403.
    #[error("request forbidden")]
    Forbidden,

    /// Any other non-success status.
    #[error("request failed with status {status}")]
    Status { status: u16, body: String },

    /// Error occurred before a response was received
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The response body could not be deserialized
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    /// Authentication-layer failure bubbling out of the session flows
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// Status code carried by this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden => Some(403),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Type alias for Result with ApiError
pub type ApiResult<T> = Result<T, ApiError>;
