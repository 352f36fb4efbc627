//! Session core for the barbería web client
//!
//! This crate owns the session/token lifecycle behind the UI: exchanging
//! identity assertions for backend sessions, keeping the access token and
//! user profile in an injectable store, wrapping every outgoing request
//! with bearer attachment and single-flight 401 recovery, and gating
//! navigation on session, role, and profile state.

pub mod exchange;
pub mod guard;
pub mod http;
pub mod identity;
pub mod models;
pub mod refresh;
pub mod store;
pub mod validation;

pub use exchange::{CredentialExchanger, ExchangeOutcome};
pub use guard::{RedirectTarget, RouteDecision, RouteRequirements, evaluate};
pub use http::ApiClient;
pub use identity::{IdentityEvent, IdentityProvider};
pub use models::{Role, UserProfile};
pub use refresh::RefreshGate;
pub use store::{SessionSnapshot, SessionStore};
pub use validation::{ProfileField, is_profile_complete, is_valid_e164, missing_profile_fields};
