//! Authentication domain models.
//!
//! The backend is loose about which user fields it returns (`/auth/login`
//! may send a trimmed profile, `/auth/me` the full document), so every field
//! is optional and unknown profile fields are kept verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Platform role of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// The authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend document id (`_id` on the wire for most endpoints).
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Remaining profile fields (phone, avatar, grade, ...).
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    /// Human-readable name: `name`, then `firstName lastName`, then email.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        self.email.clone().unwrap_or_else(|| "unknown user".to_string())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}

/// Account creation payload for `POST /auth/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    /// Extra profile fields forwarded as-is.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_accepts_mongo_id_and_keeps_profile_fields() {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "64f0",
            "firstName": "Ayşe",
            "lastName": "Yılmaz",
            "email": "ayse@example.com",
            "role": "teacher",
            "phone": "+90 555 000"
        }))
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("64f0"));
        assert_eq!(user.role, Some(Role::Teacher));
        assert_eq!(user.profile["phone"], "+90 555 000");
        assert_eq!(user.display_name(), "Ayşe Yılmaz");
    }

    #[test]
    fn partial_user_deserializes() {
        let user: User =
            serde_json::from_value(serde_json::json!({"role": "student"})).unwrap();
        assert!(user.id.is_none());
        assert!(user.has_role(Role::Student));
        assert_eq!(user.display_name(), "unknown user");
    }

    #[test]
    fn display_name_prefers_name_field() {
        let user = User {
            name: Some("Coach Kim".into()),
            first_name: Some("Kim".into()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "Coach Kim");
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("principal".parse::<Role>().is_err());
    }

    #[test]
    fn register_request_serializes_camel_case() {
        let req = RegisterRequest {
            first_name: "Can".into(),
            last_name: "Demir".into(),
            email: "can@example.com".into(),
            password: "pw".into(),
            role: Some(Role::Student),
            profile: Map::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["firstName"], "Can");
        assert_eq!(json["role"], "student");
    }
}
