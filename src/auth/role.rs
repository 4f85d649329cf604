//! Mapping from the identity provider's permission strings to [`Role`].

use crate::db::Role;

impl Role {
    /// Resolve an opaque permission string from the identity provider.
    ///
    /// Matching is exact and case-sensitive; anything unrecognized is `Deny`.
    pub fn from_permission(permission: &str) -> Self {
        match permission {
            "admin" => Self::Admin,
            "operator" => Self::Operator,
            "observer" => Self::Observer,
            "deny" => Self::Deny,
            _ => Self::Deny,
        }
    }
}
