//! Session issuance shared by every login path.

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use tracing::{debug, info};

use crate::auth::cookie::{CookieDirective, SIG_COOKIE};
use crate::auth::error::AuthResult;
use crate::auth::session_store::SessionStore;
use crate::db::{Role, UserRecord};
use crate::types::{AccessKey, AppSig, SessionSig};

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Result handed from an authenticator to the issuer.
///
/// `derived_role` and `access_token` are only set by the third-party path.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: UserRecord,
    pub derived_role: Option<Role>,
    pub access_token: Option<AccessKey>,
}

impl AuthOutcome {
    pub fn new(user: UserRecord) -> Self {
        Self {
            user,
            derived_role: None,
            access_token: None,
        }
    }
}

/// Where a login request came from.
///
/// An external application that pre-generated its own signature sends it as
/// `sig` together with a `callback` to return to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginTarget {
    #[serde(default, rename = "sig")]
    pub app_sig: Option<AppSig>,
    #[serde(default)]
    pub callback: Option<String>,
}

impl LoginTarget {
    pub fn new(app_sig: Option<&str>, callback: Option<&str>) -> Self {
        Self {
            app_sig: app_sig.map(AppSig::from),
            callback: callback.map(str::to_string),
        }
    }

    /// The application signature and callback, when both are non-empty.
    pub fn application(&self) -> Option<(&AppSig, &str)> {
        match (&self.app_sig, self.callback.as_deref()) {
            (Some(sig), Some(callback)) if !sig.is_empty() && !callback.is_empty() => {
                Some((sig, callback))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionScope {
    /// Keyed by a fresh signature that is also set as the `sig` cookie
    Direct,
    /// Keyed by the calling application's signature; no cookie
    Application,
}

/// A freshly written session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub sig: SessionSig,
    pub expired: i64,
    pub scope: SessionScope,
    pub cookies: Vec<CookieDirective>,
}

/// The single writer of session rows on login paths.
#[derive(Clone)]
pub struct SessionIssuer {
    sessions: SessionStore,
    cookie_domain: String,
}

impl SessionIssuer {
    pub fn new(sessions: SessionStore, cookie_domain: impl Into<String>) -> Self {
        Self {
            sessions,
            cookie_domain: cookie_domain.into(),
        }
    }

    /// Issue a session for `uid`, keyed by the application signature when
    /// the target names one, otherwise by a fresh SSO signature.
    pub async fn issue(
        &self,
        uid: &RecordId,
        target: &LoginTarget,
        ttl_seconds: i64,
    ) -> AuthResult<IssuedSession> {
        match target.application() {
            Some((app_sig, _)) => {
                self.create_application_session(uid, app_sig, ttl_seconds)
                    .await
            }
            None => self.create_direct_session(uid, ttl_seconds).await,
        }
    }

    /// New SSO session; its signature is set as the `sig` cookie in both scopes.
    pub async fn create_direct_session(
        &self,
        uid: &RecordId,
        ttl_seconds: i64,
    ) -> AuthResult<IssuedSession> {
        let sig = SessionSig::generate();
        let expired = unix_now() + ttl_seconds;
        self.sessions.save(uid, &sig, expired).await?;

        info!("Issued SSO session for {}", uid);
        let cookies =
            CookieDirective::scoped_pair(SIG_COOKIE, sig.as_str(), ttl_seconds, &self.cookie_domain);

        Ok(IssuedSession {
            sig,
            expired,
            scope: SessionScope::Direct,
            cookies,
        })
    }

    /// Session stored under the caller's own signature.
    pub async fn create_application_session(
        &self,
        uid: &RecordId,
        app_sig: &AppSig,
        ttl_seconds: i64,
    ) -> AuthResult<IssuedSession> {
        self.bind_application_session(uid, app_sig, unix_now() + ttl_seconds)
            .await
    }

    /// Record `app_sig` as a session for `uid` with an explicit expiry.
    ///
    /// An existing session of the same user under `app_sig` that already
    /// outlives `expired` is kept as is; expiry never moves backwards.
    pub async fn bind_application_session(
        &self,
        uid: &RecordId,
        app_sig: &AppSig,
        expired: i64,
    ) -> AuthResult<IssuedSession> {
        let sig = SessionSig::from(app_sig.clone());
        if let Some(existing) = self.sessions.read_by_sig(sig.as_str()).await? {
            if &existing.uid == uid && existing.expired >= expired {
                debug!("Application session for {} already valid until {}", uid, existing.expired);
                return Ok(IssuedSession {
                    sig,
                    expired: existing.expired,
                    scope: SessionScope::Application,
                    cookies: Vec::new(),
                });
            }
        }

        self.sessions.save(uid, &sig, expired).await?;

        info!("Issued application session for {}", uid);
        Ok(IssuedSession {
            sig,
            expired,
            scope: SessionScope::Application,
            cookies: Vec::new(),
        })
    }
}
