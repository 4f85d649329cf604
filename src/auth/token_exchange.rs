//! Login through a one-time token issued by the third-party identity provider.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::error::AuthResult;
use crate::auth::identity_provider::IdentityProvider;
use crate::auth::issuer::AuthOutcome;
use crate::auth::user_store::UserStore;
use crate::db::Role;

/// Exchanges a provider token for a local user.
///
/// The exchange fails soft: a rejected token, a provider outage and a
/// malformed answer all yield `Ok(None)` so the caller falls back to the
/// login page. Only local persistence failures are returned as errors.
#[derive(Clone)]
pub struct TokenExchangeAuthenticator {
    users: UserStore,
    provider: Arc<dyn IdentityProvider>,
}

impl TokenExchangeAuthenticator {
    pub fn new(users: UserStore, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { users, provider }
    }

    pub async fn authenticate(&self, token: &str) -> AuthResult<Option<AuthOutcome>> {
        if token.is_empty() {
            return Ok(None);
        }

        let grant = match self.provider.access(token).await {
            Ok(envelope) => match envelope.access_grant() {
                Some(grant) => grant,
                None => {
                    debug!("Provider did not accept token (status {})", envelope.status);
                    return Ok(None);
                }
            },
            Err(e) => {
                warn!("Token exchange failed: {}", e);
                return Ok(None);
            }
        };

        // The role call only decides the role and whether the access key is kept.
        let (role, access_token) = match self.provider.role(&grant.access_key).await {
            Ok(envelope) => match envelope.permission() {
                Some(permission) => (
                    Role::from_permission(permission),
                    Some(grant.access_key.clone()),
                ),
                None => {
                    debug!("Role lookup for {} returned status {}", grant.username, envelope.status);
                    (Role::Deny, None)
                }
            },
            Err(e) => {
                warn!("Role lookup for {} failed: {}", grant.username, e);
                (Role::Deny, None)
            }
        };

        let user = self
            .users
            .find_or_create(&grant.username, "", &grant.email)
            .await?;
        let user = self.users.backfill_if_unset(&user, &grant.email, role).await?;

        info!("Third-party login for {} resolved role {}", user.name, role);
        Ok(Some(AuthOutcome {
            user,
            derived_role: Some(role),
            access_token,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::AuthError;
    use crate::auth::identity_provider::ProviderEnvelope;
    use crate::auth::password::hash_password;
    use crate::db::{create_connection, ensure_schema, DatabaseConfig, UserCreate};
    use crate::types::AccessKey;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Scripted provider: fixed answers for access and role.
    struct FakeProvider {
        access: Result<Value, String>,
        role: Result<Value, String>,
    }

    fn envelope(value: &Value) -> ProviderEnvelope {
        serde_json::from_value(value.clone()).unwrap()
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn access(&self, _token: &str) -> AuthResult<ProviderEnvelope> {
            match &self.access {
                Ok(v) => Ok(envelope(v)),
                Err(e) => Err(AuthError::AuthProvider(e.clone())),
            }
        }

        async fn role(&self, _access_key: &AccessKey) -> AuthResult<ProviderEnvelope> {
            match &self.role {
                Ok(v) => Ok(envelope(v)),
                Err(e) => Err(AuthError::AuthProvider(e.clone())),
            }
        }

        async fn logout(&self, _access_key: &AccessKey) -> AuthResult<()> {
            Ok(())
        }
    }

    fn bob_access() -> Value {
        json!({"status": 1, "data": {"access_key": "K", "username": "bob", "email": "b@x.com"}})
    }

    async fn setup(provider: FakeProvider) -> (TokenExchangeAuthenticator, UserStore) {
        let config = DatabaseConfig {
            url: "memory".to_string(),
            ..Default::default()
        };
        let db = create_connection(config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        let users = UserStore::new(db);
        (
            TokenExchangeAuthenticator::new(users.clone(), Arc::new(provider)),
            users,
        )
    }

    #[tokio::test]
    async fn test_new_user_gets_resolved_role() {
        let (auth, users) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Ok(json!({"status": 1, "data": "operator"})),
        })
        .await;

        let outcome = auth.authenticate("tok").await.unwrap().unwrap();
        assert_eq!(outcome.user.name, "bob");
        assert_eq!(outcome.user.email, "b@x.com");
        assert_eq!(outcome.user.role, Role::Operator);
        assert_eq!(outcome.derived_role, Some(Role::Operator));
        assert_eq!(outcome.access_token, Some(AccessKey::new("K")));

        let stored = users.get_user_by_name("bob").await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Operator);
    }

    #[tokio::test]
    async fn test_unrecognized_permission_keeps_token() {
        let (auth, _) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Ok(json!({"status": 1, "data": "superuser"})),
        })
        .await;

        let outcome = auth.authenticate("tok").await.unwrap().unwrap();
        assert_eq!(outcome.user.role, Role::Deny);
        assert_eq!(outcome.access_token, Some(AccessKey::new("K")));
    }

    #[tokio::test]
    async fn test_failed_role_call_defaults_to_deny_without_token() {
        let (auth, _) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Err("timeout".to_string()),
        })
        .await;

        let outcome = auth.authenticate("tok").await.unwrap().unwrap();
        assert_eq!(outcome.user.role, Role::Deny);
        assert!(outcome.access_token.is_none());

        let (auth, _) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Ok(json!({"status": 0, "data": "admin"})),
        })
        .await;
        let outcome = auth.authenticate("tok").await.unwrap().unwrap();
        assert_eq!(outcome.user.role, Role::Deny);
        assert!(outcome.access_token.is_none());
    }

    #[tokio::test]
    async fn test_rejected_or_unreachable_provider_is_not_authenticated() {
        let (auth, users) = setup(FakeProvider {
            access: Ok(json!({"status": 0, "data": "expired"})),
            role: Ok(json!({"status": 1, "data": "admin"})),
        })
        .await;
        assert!(auth.authenticate("tok").await.unwrap().is_none());
        assert!(users.get_user_by_name("bob").await.unwrap().is_none());

        let (auth, _) = setup(FakeProvider {
            access: Err("connection refused".to_string()),
            role: Ok(json!({"status": 1, "data": "admin"})),
        })
        .await;
        assert!(auth.authenticate("tok").await.unwrap().is_none());

        let (auth, _) = setup(FakeProvider {
            access: Ok(json!({"status": 1, "data": {"username": "bob"}})),
            role: Ok(json!({"status": 1, "data": "admin"})),
        })
        .await;
        assert!(auth.authenticate("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_password_owner_keeps_role() {
        let (auth, users) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Ok(json!({"status": 1, "data": "admin"})),
        })
        .await;
        users
            .create_user(&UserCreate {
                name: "bob".to_string(),
                passwd: hash_password("salt", "pw").into_inner(),
                email: "old@x.com".to_string(),
                role: Role::Observer,
            })
            .await
            .unwrap();

        let outcome = auth.authenticate("tok").await.unwrap().unwrap();
        assert_eq!(outcome.user.role, Role::Observer);
        assert_eq!(outcome.user.email, "old@x.com");
        assert_eq!(outcome.derived_role, Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_repeat_login_refreshes_role_of_passwordless_user() {
        let (auth, users) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Ok(json!({"status": 1, "data": "observer"})),
        })
        .await;
        users.find_or_create("bob", "", "").await.unwrap();

        let outcome = auth.authenticate("tok").await.unwrap().unwrap();
        assert_eq!(outcome.user.role, Role::Observer);
        assert_eq!(outcome.user.email, "b@x.com");
        assert_eq!(users.count_by_name("bob").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_token_short_circuits() {
        let (auth, _) = setup(FakeProvider {
            access: Ok(bob_access()),
            role: Ok(json!({"status": 1, "data": "admin"})),
        })
        .await;
        assert!(auth.authenticate("").await.unwrap().is_none());
    }
}
