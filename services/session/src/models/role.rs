//! Role model and related functionality

use serde::{Deserialize, Serialize};

/// Application roles as issued by the backend
///
/// The backend serializes roles as upper-case strings, but upstream sources
/// are not consistent about casing, so parsing is case-insensitive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Barbero,
    Cliente,
}

impl Role {
    /// Get the role name as the backend spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Barbero => "BARBERO",
            Role::Cliente => "CLIENTE",
        }
    }

    /// Parse a role string, tolerating case variance
    ///
    /// Unknown role names yield `None` so that roles added server-side later
    /// do not break profile decoding.
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => Some(Role::Admin),
            "BARBERO" => Some(Role::Barbero),
            "CLIENTE" => Some(Role::Cliente),
            _ => None,
        }
    }

    /// Parse a list of role strings, silently dropping unknown ones
    pub fn parse_all(values: &[String]) -> Vec<Role> {
        values.iter().filter_map(|v| Role::parse(v)).collect()
    }
}
