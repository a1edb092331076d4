//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Login session handed back by [`SessionManager::create`](super::SessionManager::create).
///
/// `token` is the raw bearer token. It exists only in this value and in the
/// client's cookie; storage keeps its hash.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
}

/// Pending password reset handed back by
/// [`PasswordResetManager::generate`](super::PasswordResetManager::generate).
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// Signup / signin form. Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Password reset request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Password reset confirmation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_omits_password_hash() {
        let user = User {
            id: 7,
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("argon2id"));
    }
}
