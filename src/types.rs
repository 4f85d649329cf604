//! NewType wrappers for strong typing throughout the SSO core.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing an application signature where an SSO signature is expected,
//! or a plain password where a salted hash is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the wrapped value is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Session signature generated at login.
    ///
    /// Used both as the session key and as the value of the `sig` cookie
    /// shared across the parent cookie domain for single sign-on.
    SessionSig
);

newtype_string!(
    /// Signature pre-generated by a calling application.
    ///
    /// When a login request carries one (together with a callback), the
    /// session is stored under this value instead of a fresh `SessionSig`,
    /// so that one login event satisfies that specific caller.
    AppSig
);

newtype_string!(
    /// Access key issued by the third-party identity provider.
    ///
    /// Stored in the `token` cookie and replayed to the provider's logout
    /// endpoint.
    AccessKey
);

newtype_string!(
    /// Salted password hash as stored on a user record.
    ///
    /// The empty hash marks a principal that was provisioned by directory or
    /// third-party login and has never set a local password.
    PasswordHash
);

impl SessionSig {
    /// Generate a fresh, globally unique signature.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl From<AppSig> for SessionSig {
    fn from(sig: AppSig) -> Self {
        Self(sig.into_inner())
    }
}
