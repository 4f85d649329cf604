// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod types;

// Re-export key types and functions
pub use auth::{AuthError, AuthResult, AuthService, HttpIdentityProvider};
pub use config::AuthSettings;
pub use db::{DatabaseConfig, Role, create_connection, ensure_schema};

use std::sync::Arc;
use anyhow::Result;
use auth::DirectoryBind;

/// Convenience function to create a fully wired SSO service.
///
/// Connects to the database, applies the schema and builds the HTTP client
/// for the third-party provider. Directory login is wired to LDAP when the
/// `ldap` feature is enabled and `settings.ldap.enabled` is set.
pub async fn create_auth_service(config: DatabaseConfig, settings: AuthSettings) -> Result<AuthService> {
    let db = create_connection(config).await?;
    ensure_schema(&db).await?;

    let provider = Arc::new(HttpIdentityProvider::new(settings.api.clone())?);
    let directory = directory_binder(&settings);

    Ok(AuthService::new(db, settings, provider, directory))
}

#[cfg(feature = "ldap")]
fn directory_binder(settings: &AuthSettings) -> Option<Arc<dyn DirectoryBind>> {
    settings
        .ldap
        .enabled
        .then(|| Arc::new(auth::LdapBind::default()) as Arc<dyn DirectoryBind>)
}

#[cfg(not(feature = "ldap"))]
fn directory_binder(settings: &AuthSettings) -> Option<Arc<dyn DirectoryBind>> {
    if settings.ldap.enabled {
        tracing::warn!("ldap.enabled is set but this build has no LDAP support");
    }
    None
}
