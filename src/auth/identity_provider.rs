//! Client for the third-party identity provider.
//!
//! The provider exposes three GET endpoints:
//!
//! - `{access}/{token}/{service_key}` exchanges a one-time token for an
//!   access key and the principal's name and email
//! - `{role}/{access_key}` returns the principal's permission string
//! - `{logout}/{access_key}` ends the provider-side session
//!
//! Both JSON answers share the envelope `{"status": <int>, "data": ...}`,
//! where `status == 1` means success.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::error::{AuthError, AuthResult};
use crate::config::ThirdPartyApi;
use crate::types::AccessKey;

/// Timeout applied to every provider call.
pub const PROVIDER_TIMEOUT_SECONDS: u64 = 10;

/// Raw envelope returned by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEnvelope {
    pub status: f64,
    #[serde(default)]
    pub data: Value,
}

impl ProviderEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == 1.0
    }
}

/// Principal returned by a successful token exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessGrant {
    pub access_key: AccessKey,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

impl ProviderEnvelope {
    /// The access grant, if this is a successful exchange with a well-formed payload.
    pub fn access_grant(&self) -> Option<AccessGrant> {
        if !self.is_success() {
            return None;
        }
        match serde_json::from_value::<AccessGrant>(self.data.clone()) {
            Ok(grant) if !grant.username.is_empty() && !grant.access_key.is_empty() => {
                Some(grant)
            }
            Ok(_) => None,
            Err(e) => {
                debug!("Malformed access payload: {}", e);
                None
            }
        }
    }

    /// The permission string of a successful role lookup.
    ///
    /// `Some("")` is returned for a success whose payload is not a string, so
    /// the caller still sees the call as successful.
    pub fn permission(&self) -> Option<&str> {
        if !self.is_success() {
            return None;
        }
        Some(self.data.as_str().unwrap_or_default())
    }
}

/// Remote operations of the third-party identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a one-time token for an access grant.
    async fn access(&self, token: &str) -> AuthResult<ProviderEnvelope>;

    /// Look up the permission attached to an access key.
    async fn role(&self, access_key: &AccessKey) -> AuthResult<ProviderEnvelope>;

    /// Notify the provider that the user logged out.
    async fn logout(&self, access_key: &AccessKey) -> AuthResult<()>;
}

/// [`IdentityProvider`] over HTTP.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    api: ThirdPartyApi,
    client: Client,
}

impl HttpIdentityProvider {
    pub fn new(api: ThirdPartyApi) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECONDS))
            .user_agent("uic-sso/0.1.0")
            .build()?;
        Ok(Self { api, client })
    }

    async fn get_envelope(&self, url: Url) -> AuthResult<ProviderEnvelope> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuthError::AuthProvider(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AuthError::AuthProvider(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json::<ProviderEnvelope>()
            .await
            .map_err(|e| AuthError::AuthProvider(format!("Invalid response from {}: {}", url, e)))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn access(&self, token: &str) -> AuthResult<ProviderEnvelope> {
        let url = endpoint(&self.api.access, &[token, self.api.key.as_str()])?;
        self.get_envelope(url).await
    }

    async fn role(&self, access_key: &AccessKey) -> AuthResult<ProviderEnvelope> {
        let url = endpoint(&self.api.role, &[access_key.as_str()])?;
        self.get_envelope(url).await
    }

    async fn logout(&self, access_key: &AccessKey) -> AuthResult<()> {
        let url = endpoint(&self.api.logout, &[access_key.as_str()])?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuthError::AuthProvider(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AuthError::AuthProvider(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        Ok(())
    }
}

/// Append percent-encoded path segments to a configured base URL.
pub fn endpoint(base: &str, segments: &[&str]) -> AuthResult<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| AuthError::AuthProvider(format!("Invalid endpoint {:?}: {}", base, e)))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| AuthError::AuthProvider(format!("Endpoint {:?} cannot take a path", base)))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// URL of the provider's login page: `{login}/{urlencode(base64(redirect))}`.
pub fn third_party_login_url(api: &ThirdPartyApi) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(api.redirect.as_bytes());
    let escaped: String = url::form_urlencoded::byte_serialize(encoded.as_bytes()).collect();
    format!("{}/{}", api.login, escaped)
}
