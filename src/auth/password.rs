//! Salted password hashing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::types::PasswordHash;

/// Hash `password` with the process-wide secret `salt` (salt first).
pub fn hash_password(salt: &str, password: &str) -> PasswordHash {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    PasswordHash::new(format!("{:x}", hasher.finalize()))
}

/// Check `password` against a stored hash.
///
/// An empty stored hash never matches: such users have no local credential.
pub fn verify_password(salt: &str, password: &str, stored: &str) -> bool {
    if stored.is_empty() {
        return false;
    }
    let computed = hash_password(salt, password);
    computed.as_str().as_bytes().ct_eq(stored.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_hex() {
        let a = hash_password("salt", "secret");
        let b = hash_password("salt", "secret");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_salt_changes_hash() {
        assert_ne!(hash_password("a", "secret"), hash_password("b", "secret"));
    }

    #[test]
    fn test_verify() {
        let stored = hash_password("salt", "secret");
        assert!(verify_password("salt", "secret", stored.as_str()));
        assert!(!verify_password("salt", "wrong", stored.as_str()));
        assert!(!verify_password("other", "secret", stored.as_str()));
    }

    #[test]
    fn test_empty_stored_hash_never_matches() {
        assert!(!verify_password("", "", ""));
        assert!(!verify_password("salt", "anything", ""));
    }

    #[test]
    fn test_truncated_or_foreign_hash_never_matches() {
        let stored = hash_password("salt", "secret");
        assert!(!verify_password("salt", "secret", &stored.as_str()[..63]));
        assert!(!verify_password("salt", "secret", &format!("{}0", stored.as_str())));
        assert!(!verify_password("salt", "secret", &stored.as_str().to_uppercase()));
    }
}
