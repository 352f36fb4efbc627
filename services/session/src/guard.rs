//! Navigation gate
//!
//! Pure route-level predicates over the session snapshot. The router asks
//! `evaluate` before rendering a protected route and follows the returned
//! decision; no redirect decision is made while the initial silent refresh
//! is still unresolved.

use crate::models::Role;
use crate::store::SessionSnapshot;
use crate::validation::{ProfileField, missing_profile_fields};

/// What a route demands from the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequirements {
    /// Roles allowed on this route; empty means any authenticated user
    pub roles: Vec<Role>,
    /// Whether the booking flow's complete-profile rule applies here
    pub requires_complete_profile: bool,
}

impl RouteRequirements {
    /// Any authenticated user
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Restricted to the given roles (any match grants access)
    pub fn for_roles(roles: &[Role]) -> Self {
        Self {
            roles: roles.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_complete_profile(mut self) -> Self {
        self.requires_complete_profile = true;
        self
    }
}

/// Where to send the user instead of rendering the route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// To the login route, remembering where the user wanted to go
    Login { return_to: String },
    /// To the safe default route (role mismatch is not an error page)
    Home,
    /// To the profile-completion route, with the fields still missing
    CompleteProfile { missing: Vec<ProfileField> },
}

/// Outcome of evaluating a route transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Session state not resolved yet; render a placeholder, decide later
    Pending,
    Redirect(RedirectTarget),
}

/// Decide whether the session may enter a route
pub fn evaluate(
    snapshot: &SessionSnapshot,
    requirements: &RouteRequirements,
    requested_path: &str,
) -> RouteDecision {
    // deciding on unresolved state is the defect class this exists to
    // prevent
    if snapshot.loading {
        return RouteDecision::Pending;
    }

    if snapshot.access_token.is_none() {
        return RouteDecision::Redirect(RedirectTarget::Login {
            return_to: requested_path.to_string(),
        });
    }

    let user_roles: Vec<Role> = snapshot
        .user
        .as_ref()
        .map(|u| u.parsed_roles())
        .unwrap_or_default();

    if !requirements.roles.is_empty()
        && !requirements.roles.iter().any(|r| user_roles.contains(r))
    {
        return RouteDecision::Redirect(RedirectTarget::Home);
    }

    if requirements.requires_complete_profile && user_roles.contains(&Role::Cliente) {
        if let Some(user) = &snapshot.user {
            let missing = missing_profile_fields(user);
            if !missing.is_empty() {
                return RouteDecision::Redirect(RedirectTarget::CompleteProfile { missing });
            }
        }
    }

    RouteDecision::Allow
}
