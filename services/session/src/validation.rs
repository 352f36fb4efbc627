//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::UserProfile;

/// Profile fields the booking flow requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Nombre,
    Telefono,
}

impl ProfileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Nombre => "nombre",
            ProfileField::Telefono => "telefono",
        }
    }
}

/// Validate a phone number against the E.164 shape
pub fn is_valid_e164(telefono: &str) -> bool {
    static TELEFONO_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TELEFONO_REGEX.get_or_init(|| {
        Regex::new(r"^\+[1-9]\d{6,14}$").expect("Failed to compile telefono regex")
    });

    regex.is_match(telefono.trim())
}

/// Fields still missing before the profile counts as complete
///
/// Complete means a non-empty name and an E.164-shaped phone number. The
/// list feeds the profile-completion redirect so the form can highlight
/// what is missing.
pub fn missing_profile_fields(user: &UserProfile) -> Vec<ProfileField> {
    let mut missing = Vec::new();

    if user.nombre.trim().is_empty() {
        missing.push(ProfileField::Nombre);
    }

    let telefono_ok = user
        .telefono_e164
        .as_deref()
        .is_some_and(is_valid_e164);
    if !telefono_ok {
        missing.push(ProfileField::Telefono);
    }

    missing
}

/// Derived predicate: the profile is complete when nothing is missing
pub fn is_profile_complete(user: &UserProfile) -> bool {
    missing_profile_fields(user).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(nombre: &str, telefono: Option<&str>) -> UserProfile {
        UserProfile {
            id: 1,
            nombre: nombre.to_string(),
            apellido: String::new(),
            email: None,
            username: None,
            telefono_e164: telefono.map(|t| t.to_string()),
            telefono_verificado: false,
            proveedor: None,
            proveedor_id: None,
            avatar_url: None,
            roles: vec!["CLIENTE".to_string()],
            barbero_id: None,
            cliente_id: None,
        }
    }

    #[test]
    fn test_valid_e164_numbers() {
        assert!(is_valid_e164("+5215512345678"));
        assert!(is_valid_e164("+14155551234"));
        assert!(is_valid_e164(" +5215512345678 "));
    }

    #[test]
    fn test_invalid_e164_numbers() {
        assert!(!is_valid_e164(""));
        assert!(!is_valid_e164("5512345678"));
        assert!(!is_valid_e164("+0525512345678"));
        assert!(!is_valid_e164("+52 5512345678"));
        assert!(!is_valid_e164("+521234"));
    }

    #[test]
    fn test_complete_profile_has_no_missing_fields() {
        let u = user("Luis", Some("+5215512345678"));
        assert!(is_profile_complete(&u));
        assert!(missing_profile_fields(&u).is_empty());
    }

    #[test]
    fn test_blank_nombre_is_missing() {
        let u = user("   ", Some("+5215512345678"));
        assert_eq!(missing_profile_fields(&u), vec![ProfileField::Nombre]);
    }

    #[test]
    fn test_missing_everything() {
        let u = user("", None);
        let missing = missing_profile_fields(&u);
        assert_eq!(missing, vec![ProfileField::Nombre, ProfileField::Telefono]);
        // the names the completion form highlights
        let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, vec!["nombre", "telefono"]);
    }
}
