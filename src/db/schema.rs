use serde::{Deserialize, Serialize};
use std::fmt;
use surrealdb::{RecordId, sql::Datetime};

/// Fixed authorization level attached to a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    Observer,
    #[default]
    Deny,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
            Self::Observer => "observer",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Database identifier (table: `user`)
    pub id: RecordId,
    /// Unique, case-preserving login name
    pub name: String,
    /// Salted password hash; empty for principals that never set a local password
    pub passwd: String,
    pub email: String,
    pub role: Role,
    pub created_at: Option<Datetime>,
    pub updated_at: Option<Datetime>,
}

impl UserRecord {
    /// Whether this user owns a local credential.
    ///
    /// Users without one were provisioned by directory or third-party login
    /// and may have their email and role backfilled by later logins.
    pub fn has_local_password(&self) -> bool {
        !self.passwd.is_empty()
    }
}

/// Payload for creating a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub passwd: String,
    pub email: String,
    pub role: Role,
}

/// Persisted login grant, keyed by its signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Owning user
    pub uid: RecordId,
    /// SSO signature or application-supplied signature
    pub sig: String,
    /// Absolute Unix timestamp after which the session is invalid
    pub expired: i64,
}

impl SessionRecord {
    /// A session is valid iff `now < expired`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Operator).unwrap(), "\"operator\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_role_default_is_deny() {
        assert_eq!(Role::default(), Role::Deny);
        assert_eq!(Role::default().to_string(), "deny");
    }

    #[test]
    fn test_session_validity_boundary() {
        let session = SessionRecord {
            uid: RecordId::from_table_key("user", "u1"),
            sig: "s".to_string(),
            expired: 1_000,
        };
        assert!(session.is_valid_at(999));
        assert!(!session.is_valid_at(1_000));
        assert!(!session.is_valid_at(1_001));
    }
}
