//! In-memory session store
//!
//! Process-wide session state behind an injectable, cheap-clone handle.
//! The store holds the short-lived access token and the denormalized user
//! profile; the durable side of the session is a server-set httpOnly
//! refresh cookie this code never reads. Tests instantiate isolated stores
//! instead of sharing a global.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::http::ApiClient;
use crate::identity::IdentityProvider;
use crate::models::{Role, UserProfile};

/// Atomic read of the full session state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
    /// True while a session-affecting operation (login exchange, bootstrap
    /// refresh, logout) is in flight
    pub loading: bool,
}

/// Injectable session state handle
///
/// All reads are side-effect free; mutation happens only through the
/// documented operations. UI layers read fields and call these operations,
/// never touching the state directly.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionStore {
    /// Create a store in the initial (unauthenticated) state
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> SessionSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write<F: FnOnce(&mut SessionSnapshot)>(&self, f: F) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    /// Current access token, if any
    pub fn access_token(&self) -> Option<String> {
        self.read().access_token
    }

    /// Current user profile snapshot, if any
    pub fn user(&self) -> Option<UserProfile> {
        self.read().user
    }

    /// Atomic snapshot of token, user, and loading flag
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn set_loading(&self, loading: bool) {
        self.write(|s| s.loading = loading);
    }

    /// Replace token and user atomically
    pub fn set_session(&self, token: Option<String>, user: Option<UserProfile>) {
        self.write(|s| {
            s.access_token = token;
            s.user = user;
        });
    }

    /// Replace the token only, leaving a known user untouched
    ///
    /// Silent refreshes go through here so that a token-only refresh never
    /// nulls out the profile.
    pub fn set_token(&self, token: Option<String>) {
        self.write(|s| s.access_token = token);
    }

    /// Replace the profile only, token untouched
    pub fn set_user(&self, user: Option<UserProfile>) {
        self.write(|s| s.user = user);
    }

    /// A session is authenticated only while a token is present; the user
    /// snapshot alone is never trusted for authorization.
    pub fn is_authenticated(&self) -> bool {
        self.read().access_token.is_some()
    }

    /// Reset to the initial state. Idempotent.
    pub fn clear(&self) {
        self.write(|s| *s = SessionSnapshot::default());
    }

    fn roles(&self) -> Vec<Role> {
        let state = self.read();
        if state.access_token.is_none() {
            return Vec::new();
        }
        state
            .user
            .map(|u| u.parsed_roles())
            .unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.roles().contains(&Role::Admin)
    }

    /// True when the user has the BARBERO role but not ADMIN
    pub fn is_barbero_only(&self) -> bool {
        let roles = self.roles();
        roles.contains(&Role::Barbero) && !roles.contains(&Role::Admin)
    }

    /// Staff id to filter appointment queries by
    ///
    /// A barbero who is not an admin only sees their own appointments;
    /// admins see everything (no filter).
    pub fn barbero_filter_id(&self) -> Option<i64> {
        if !self.is_barbero_only() {
            return None;
        }
        self.read().user.and_then(|u| u.barbero_id)
    }

    /// Terminate the session: best-effort sign-out at the identity provider
    /// and the backend, then reset local state. Safe to call when already
    /// logged out.
    ///
    /// Remote failures are logged, not surfaced; the local session must be
    /// cleared regardless of what the upstreams answer.
    pub async fn logout(&self, identity: &dyn IdentityProvider, api: &ApiClient) {
        self.set_loading(true);

        if let Err(err) = identity.sign_out().await {
            warn!("identity provider sign-out failed: {}", err);
        }

        if let Err(err) = api.logout().await {
            warn!("backend logout failed: {}", err);
        }

        self.clear();
        info!("session cleared");
    }
}
