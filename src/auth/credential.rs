//! Local name + password authentication.

use tracing::debug;

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::issuer::AuthOutcome;
use crate::auth::password::verify_password;
use crate::auth::user_store::UserStore;

/// Checks a name and password against the stored salted hash.
#[derive(Clone)]
pub struct CredentialAuthenticator {
    users: UserStore,
    salt: String,
}

impl CredentialAuthenticator {
    pub fn new(users: UserStore, salt: impl Into<String>) -> Self {
        Self {
            users,
            salt: salt.into(),
        }
    }

    pub async fn authenticate(&self, name: &str, password: &str) -> AuthResult<AuthOutcome> {
        if name.is_empty() || password.is_empty() {
            return Err(AuthError::validation("name or password is blank"));
        }

        let user = self
            .users
            .get_user_by_name(name)
            .await?
            .ok_or_else(|| AuthError::NotFound(name.to_string()))?;

        if !verify_password(&self.salt, password, &user.passwd) {
            debug!("Password mismatch for {}", name);
            return Err(AuthError::InvalidCredential);
        }

        Ok(AuthOutcome::new(user))
    }
}
