//! Directory (bind-based) authentication with auto-provisioning.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::issuer::AuthOutcome;
use crate::auth::user_store::UserStore;

/// A single bind-authentication call against an external directory.
///
/// `Ok(false)` means the directory rejected the credentials; `Err` means the
/// call itself failed.
#[async_trait]
pub trait DirectoryBind: Send + Sync {
    async fn bind(&self, addr: &str, username: &str, password: &str) -> anyhow::Result<bool>;
}

/// Split a presented identifier into `(username, email)`.
///
/// `alice@example.com` becomes `("alice", "alice@example.com")`; anything
/// without exactly one `@` is used whole as the username with no email.
pub fn split_principal(name: &str) -> (String, String) {
    let parts: Vec<&str> = name.split('@').collect();
    match parts.as_slice() {
        [local, _domain] => (local.to_string(), name.to_string()),
        _ => (name.to_string(), String::new()),
    }
}

/// Delegates the credential check to a directory and provisions the user.
#[derive(Clone)]
pub struct DirectoryAuthenticator {
    users: UserStore,
    binder: Arc<dyn DirectoryBind>,
    addr: String,
}

impl DirectoryAuthenticator {
    pub fn new(users: UserStore, binder: Arc<dyn DirectoryBind>, addr: impl Into<String>) -> Self {
        Self {
            users,
            binder,
            addr: addr.into(),
        }
    }

    pub async fn authenticate(&self, name: &str, password: &str) -> AuthResult<AuthOutcome> {
        if name.is_empty() || password.is_empty() {
            return Err(AuthError::validation("name or password is blank"));
        }

        let (user_name, user_email) = split_principal(name);
        if user_name.is_empty() {
            return Err(AuthError::validation("name pattern is invalid"));
        }

        let accepted = self
            .binder
            .bind(&self.addr, name, password)
            .await
            .map_err(|e| {
                warn!("Directory bind against {} failed: {}", self.addr, e);
                AuthError::AuthProvider(e.to_string())
            })?;

        if !accepted {
            debug!("Directory rejected credentials for {}", name);
            return Err(AuthError::InvalidCredential);
        }

        let user = self
            .users
            .find_or_create(&user_name, "", &user_email)
            .await?;

        Ok(AuthOutcome::new(user))
    }
}

/// [`DirectoryBind`] over LDAP simple bind.
#[cfg(feature = "ldap")]
pub struct LdapBind {
    timeout: std::time::Duration,
}

#[cfg(feature = "ldap")]
impl LdapBind {
    pub fn new(timeout: std::time::Duration) -> Self {
        Self { timeout }
    }
}

#[cfg(feature = "ldap")]
impl Default for LdapBind {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(10))
    }
}

#[cfg(feature = "ldap")]
#[async_trait]
impl DirectoryBind for LdapBind {
    async fn bind(&self, addr: &str, username: &str, password: &str) -> anyhow::Result<bool> {
        use ldap3::{LdapConnAsync, LdapConnSettings};

        // An empty password would be an unauthenticated bind, which succeeds.
        if password.is_empty() {
            return Ok(false);
        }

        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, addr).await?;
        ldap3::drive!(conn);

        let result = ldap.simple_bind(username, password).await?;
        let _ = ldap.unbind().await;

        match result.rc {
            0 => Ok(true),
            // invalidCredentials
            49 => Ok(false),
            rc => Err(anyhow::anyhow!("LDAP bind returned code {}: {}", rc, result.text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_connection, ensure_schema, DatabaseConfig, Role};
    use std::sync::Mutex;

    /// Accepts a single password; records every bind it sees.
    struct FakeDirectory {
        password: String,
        fail: bool,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeDirectory {
        fn accepting(password: &str) -> Self {
            Self {
                password: password.to_string(),
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                password: String::new(),
                fail: true,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DirectoryBind for FakeDirectory {
        async fn bind(&self, addr: &str, username: &str, password: &str) -> anyhow::Result<bool> {
            self.calls
                .lock()
                .unwrap()
                .push((addr.to_string(), username.to_string()));
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(password == self.password)
        }
    }

    async fn setup(directory: Arc<FakeDirectory>) -> (DirectoryAuthenticator, UserStore) {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        let users = UserStore::new(db);
        (
            DirectoryAuthenticator::new(users.clone(), directory, "ldap://dir:389"),
            users,
        )
    }

    #[test]
    fn test_split_principal() {
        assert_eq!(
            split_principal("alice@example.com"),
            ("alice".to_string(), "alice@example.com".to_string())
        );
        assert_eq!(split_principal("alice"), ("alice".to_string(), String::new()));
        assert_eq!(
            split_principal("a@b@c"),
            ("a@b@c".to_string(), String::new())
        );
    }

    #[tokio::test]
    async fn test_first_login_provisions_user() {
        let directory = Arc::new(FakeDirectory::accepting("pw"));
        let (auth, users) = setup(directory.clone()).await;

        let outcome = auth.authenticate("alice@example.com", "pw").await.unwrap();

        assert_eq!(outcome.user.name, "alice");
        assert_eq!(outcome.user.email, "alice@example.com");
        assert_eq!(outcome.user.passwd, "");
        assert_eq!(outcome.user.role, Role::Deny);
        assert!(users.get_user_by_name("alice").await.unwrap().is_some());

        // The directory sees the identifier exactly as presented.
        let calls = directory.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("ldap://dir:389".to_string(), "alice@example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn test_repeat_login_reuses_user() {
        let directory = Arc::new(FakeDirectory::accepting("pw"));
        let (auth, users) = setup(directory).await;

        let first = auth.authenticate("alice", "pw").await.unwrap();
        let second = auth.authenticate("alice", "pw").await.unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(users.count_by_name("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejected_bind_is_invalid_credential() {
        let directory = Arc::new(FakeDirectory::accepting("pw"));
        let (auth, users) = setup(directory).await;

        let err = auth.authenticate("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential));
        assert!(users.get_user_by_name("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_local_part_rejected_before_bind() {
        let directory = Arc::new(FakeDirectory::accepting("pw"));
        let (auth, _) = setup(directory.clone()).await;

        let err = auth.authenticate("@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(directory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bind_error_is_provider_error() {
        let directory = Arc::new(FakeDirectory::unreachable());
        let (auth, _) = setup(directory).await;

        let err = auth.authenticate("alice", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::AuthProvider(msg) if msg.contains("connection refused")));
    }
}
