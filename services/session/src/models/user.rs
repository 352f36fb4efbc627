//! User model and auth wire payloads

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Denormalized user profile snapshot, as returned by `/api/usuarios/me`
/// and by the credential exchange endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub telefono_e164: Option<String>,
    #[serde(default)]
    pub telefono_verificado: bool,
    #[serde(default)]
    pub proveedor: Option<String>,
    #[serde(default)]
    pub proveedor_id: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub barbero_id: Option<i64>,
    #[serde(default)]
    pub cliente_id: Option<i64>,
}

impl UserProfile {
    /// Parsed roles, unknown role strings dropped
    pub fn parsed_roles(&self) -> Vec<Role> {
        Role::parse_all(&self.roles)
    }

    /// Case-insensitive role membership check
    pub fn has_role(&self, role: Role) -> bool {
        self.parsed_roles().contains(&role)
    }
}

/// Body of `POST /auth/firebase/exchange`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub id_token: String,
}

/// Response of `POST /auth/firebase/exchange`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Response of `POST /auth/refresh`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Body of `PUT /api/usuarios/me` (profile completion flow)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apellido: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono_e164: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_json() -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "nombre": "Luis",
            "apellido": "Mora",
            "email": null,
            "username": "lmora",
            "telefonoE164": "+5215512345678",
            "telefonoVerificado": true,
            "proveedor": "firebase",
            "proveedorId": "abc123",
            "avatarUrl": null,
            "roles": ["cliente", "BARBERO"],
            "barberoId": 3,
            "clienteId": null
        })
    }

    #[test]
    fn test_profile_decodes_camel_case_fields() {
        let user: UserProfile =
            serde_json::from_value(profile_json()).expect("decode user profile");
        assert_eq!(user.id, 7);
        assert_eq!(user.telefono_e164.as_deref(), Some("+5215512345678"));
        assert_eq!(user.barbero_id, Some(3));
        assert!(user.telefono_verificado);
    }

    #[test]
    fn test_profile_roles_parse_case_insensitively() {
        let user: UserProfile =
            serde_json::from_value(profile_json()).expect("decode user profile");
        assert!(user.has_role(Role::Cliente));
        assert!(user.has_role(Role::Barbero));
        assert!(!user.has_role(Role::Admin));
    }

    #[test]
    fn test_profile_tolerates_missing_optional_fields() {
        let user: UserProfile =
            serde_json::from_value(serde_json::json!({ "id": 1 })).expect("decode minimal user");
        assert_eq!(user.nombre, "");
        assert!(user.roles.is_empty());
        assert_eq!(user.barbero_id, None);
    }

    #[test]
    fn test_update_me_skips_absent_fields() {
        let payload = UpdateMeRequest {
            nombre: Some("Ana".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).expect("serialize payload");
        assert_eq!(json, serde_json::json!({ "nombre": "Ana" }));
    }

    #[test]
    fn test_exchange_response_tolerates_missing_user() {
        let parsed: ExchangeResponse =
            serde_json::from_value(serde_json::json!({ "ok": true, "accessToken": "T1" }))
                .expect("decode exchange response");
        assert!(parsed.ok);
        assert_eq!(parsed.access_token.as_deref(), Some("T1"));
        assert!(parsed.user.is_none());
    }
}
