//! Identity provider abstraction
//!
//! The web client consumes a third-party identity provider (phone OTP,
//! social sign-in) purely as an issuer of short-lived identity assertions.
//! This module abstracts it as an inbound event stream plus two explicit
//! operations, so the session core never depends on a concrete SDK.

use async_trait::async_trait;
use common::error::AuthResult;

/// Identity-change notification emitted by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// The provider holds a signed-in identity and issued a fresh assertion
    SignedIn { assertion: String },
    /// The provider reports no identity (signed out, or session revoked)
    SignedOut,
}

/// Operations the session core needs from the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider for the current identity assertion, if any
    ///
    /// Used to resync the backend session outside the event stream, for
    /// example when the application regains focus.
    async fn current_assertion(&self) -> AuthResult<Option<String>>;

    /// Sign the identity out at the provider
    async fn sign_out(&self) -> AuthResult<()>;
}
