//! The authentication facade used by the HTTP layer.
//!
//! [`AuthService`] owns one instance of every authenticator plus the session
//! issuer and exposes the request-level operations: password login, token
//! login, session check, logout and registration. It never touches an HTTP
//! response; results carry [`CookieDirective`]s and redirect targets instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::cookie::{CookieDirective, SIG_COOKIE, TOKEN_COOKIE};
use crate::auth::credential::CredentialAuthenticator;
use crate::auth::directory::{DirectoryAuthenticator, DirectoryBind};
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::identity_provider::{self, IdentityProvider};
use crate::auth::issuer::{IssuedSession, LoginTarget, SessionIssuer, unix_now};
use crate::auth::password::hash_password;
use crate::auth::session_store::SessionStore;
use crate::auth::token_exchange::TokenExchangeAuthenticator;
use crate::auth::user_store::UserStore;
use crate::config::AuthSettings;
use crate::db::{Db, Role, UserCreate, UserRecord};
use crate::types::AccessKey;

const MAX_NAME_LEN: usize = 64;

/// Whether `name` is acceptable for local registration.
pub fn is_username_valid(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Password login request.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub name: String,
    pub password: String,
    /// Check the password against the directory instead of the local hash.
    pub use_directory: bool,
    pub target: LoginTarget,
}

/// Local registration request.
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub password: String,
    pub repeat_password: String,
}

/// Data needed to render the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPage {
    pub can_register: bool,
    pub ldap_enabled: bool,
    pub sig: String,
    pub callback: String,
    pub shortcut: BTreeMap<String, String>,
}

/// Successful password login or registration.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub user: UserRecord,
    pub session: IssuedSession,
    /// Application callback to continue to; empty for direct logins.
    pub callback: String,
}

/// Outcome of a third-party token login.
#[derive(Debug, Clone)]
pub enum TokenLogin {
    LoggedIn {
        user: UserRecord,
        /// Role the provider reported for this login; the stored role differs
        /// when the user owns a local password.
        derived_role: Option<Role>,
        session: IssuedSession,
        cookies: Vec<CookieDirective>,
        redirect: String,
    },
    LoginRequired(LoginPage),
}

/// Outcome of checking the SSO cookie on an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    LoginRequired(LoginPage),
    Redirect(String),
}

/// Result of a local logout.
#[derive(Debug)]
pub struct LogoutOutcome {
    /// Number of sessions deleted for the user
    pub removed: usize,
    pub cookies: Vec<CookieDirective>,
    pub redirect: String,
    /// Detached provider notification, present when an access token was given.
    pub notification: Option<JoinHandle<()>>,
}

/// Request-level authentication operations.
#[derive(Clone)]
pub struct AuthService {
    settings: Arc<AuthSettings>,
    users: UserStore,
    sessions: SessionStore,
    issuer: SessionIssuer,
    credentials: CredentialAuthenticator,
    directory: Option<DirectoryAuthenticator>,
    token_exchange: TokenExchangeAuthenticator,
    provider: Arc<dyn IdentityProvider>,
}

impl AuthService {
    /// Wire every component over a shared database handle.
    ///
    /// Directory login is available only when `directory` is given and
    /// `settings.ldap.enabled` is set.
    pub fn new(
        db: Db,
        settings: AuthSettings,
        provider: Arc<dyn IdentityProvider>,
        directory: Option<Arc<dyn DirectoryBind>>,
    ) -> Self {
        let users = UserStore::new(db.clone());
        let sessions = SessionStore::new(db);
        let issuer = SessionIssuer::new(sessions.clone(), settings.cookie_domain.clone());
        let credentials = CredentialAuthenticator::new(users.clone(), settings.salt.clone());
        let directory = match directory {
            Some(binder) if settings.ldap.enabled => Some(DirectoryAuthenticator::new(
                users.clone(),
                binder,
                settings.ldap.addr.clone(),
            )),
            _ => None,
        };
        let token_exchange = TokenExchangeAuthenticator::new(users.clone(), provider.clone());

        Self {
            settings: Arc::new(settings),
            users,
            sessions,
            issuer,
            credentials,
            directory,
            token_exchange,
            provider,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn ttl(&self) -> i64 {
        self.settings.session_ttl_seconds
    }

    /// Password login, against the local hash or the directory.
    pub async fn login(&self, form: LoginForm) -> AuthResult<LoginResponse> {
        let outcome = if form.use_directory {
            let directory = self
                .directory
                .as_ref()
                .ok_or_else(|| AuthError::validation("ldap is not enabled"))?;
            directory.authenticate(&form.name, &form.password).await?
        } else {
            self.credentials
                .authenticate(&form.name, &form.password)
                .await?
        };

        let session = self
            .issuer
            .issue(&outcome.user.id, &form.target, self.ttl())
            .await?;

        info!("User {} logged in ({:?})", outcome.user.name, session.scope);
        Ok(LoginResponse {
            user: outcome.user,
            session,
            callback: form.target.callback.unwrap_or_default(),
        })
    }

    /// Login with a one-time token from the third-party provider.
    pub async fn login_with_token(&self, token: &str, target: LoginTarget) -> AuthResult<TokenLogin> {
        let Some(outcome) = self.token_exchange.authenticate(token).await? else {
            return Ok(TokenLogin::LoginRequired(self.login_page(&target)));
        };

        let session = self
            .issuer
            .issue(&outcome.user.id, &target, self.ttl())
            .await?;

        info!(
            "User {} logged in via third party (provider role {}, stored role {})",
            outcome.user.name,
            outcome.derived_role.unwrap_or_default(),
            outcome.user.role
        );

        let mut cookies = session.cookies.clone();
        if let Some(access_key) = &outcome.access_token {
            cookies.extend(CookieDirective::scoped_pair(
                TOKEN_COOKIE,
                access_key.as_str(),
                self.ttl(),
                &self.settings.cookie_domain,
            ));
        }

        Ok(TokenLogin::LoggedIn {
            user: outcome.user,
            derived_role: outcome.derived_role,
            session,
            cookies,
            redirect: self.settings.landing_path.clone(),
        })
    }

    /// Decide what to do with a request carrying (or lacking) an SSO cookie.
    pub async fn check_session(
        &self,
        cookie_sig: Option<&str>,
        target: LoginTarget,
    ) -> AuthResult<SessionCheck> {
        let sig = match cookie_sig {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Ok(SessionCheck::LoginRequired(self.login_page(&target))),
        };

        let Some(session) = self.sessions.read_by_sig(sig).await? else {
            debug!("No session for presented signature");
            return Ok(SessionCheck::LoginRequired(self.login_page(&target)));
        };

        if !session.is_valid_at(unix_now()) {
            let removed = self.sessions.remove_by_uid(&session.uid).await?;
            info!("Session of {} expired, removed {} session(s)", session.uid, removed);
            return Ok(SessionCheck::LoginRequired(self.login_page(&target)));
        }

        match target.application() {
            Some((app_sig, callback)) => {
                self.issuer
                    .bind_application_session(&session.uid, app_sig, session.expired)
                    .await?;
                Ok(SessionCheck::Redirect(callback.to_string()))
            }
            None => Ok(SessionCheck::Redirect(self.settings.landing_path.clone())),
        }
    }

    /// End every session of `user` and clear both cookies.
    ///
    /// When an access token is given the provider is notified from a detached
    /// task; its outcome is only logged.
    pub async fn logout(
        &self,
        user: &UserRecord,
        access_token: Option<&str>,
    ) -> AuthResult<LogoutOutcome> {
        let removed = self.sessions.remove_by_uid(&user.id).await?;
        info!("User {} logged out, removed {} session(s)", user.name, removed);

        let mut cookies = CookieDirective::cleared_pair(SIG_COOKIE, &self.settings.cookie_domain);
        cookies.extend(CookieDirective::cleared_pair(
            TOKEN_COOKIE,
            &self.settings.cookie_domain,
        ));

        let notification = match access_token {
            Some(token) if !token.is_empty() => {
                let provider = self.provider.clone();
                let token = AccessKey::new(token);
                Some(tokio::spawn(async move {
                    match provider.logout(&token).await {
                        Ok(()) => debug!("Provider logout notified"),
                        Err(e) => warn!("Provider logout failed: {}", e),
                    }
                }))
            }
            _ => None,
        };

        Ok(LogoutOutcome {
            removed,
            cookies,
            redirect: self.settings.login_path.clone(),
            notification,
        })
    }

    /// Create a local account and log it in.
    pub async fn register(&self, form: RegisterForm) -> AuthResult<LoginResponse> {
        if !self.settings.can_register {
            return Err(AuthError::validation("registration system is not open"));
        }

        let name = form.name.trim();
        let password = form.password.trim();
        let repeat_password = form.repeat_password.trim();

        if password.is_empty() {
            return Err(AuthError::validation("password is blank"));
        }
        if password != repeat_password {
            return Err(AuthError::validation("password not equal the repeat one"));
        }
        if !is_username_valid(name) {
            return Err(AuthError::validation("name pattern is invalid"));
        }
        if self.users.get_user_by_name(name).await?.is_some() {
            return Err(AuthError::validation("name is already existent"));
        }

        let create = UserCreate {
            name: name.to_string(),
            passwd: hash_password(&self.settings.salt, password).into_inner(),
            email: String::new(),
            role: Role::default(),
        };
        let user = match self.users.create_user(&create).await {
            Ok(user) => user,
            Err(e) => {
                // Lost a race against a concurrent registration of the same name.
                if self.users.get_user_by_name(name).await?.is_some() {
                    debug!("Registration of {} raced: {}", name, e);
                    return Err(AuthError::validation("name is already existent"));
                }
                return Err(e.into());
            }
        };

        info!("Registered user {}", user.name);
        let session = self
            .issuer
            .create_direct_session(&user.id, self.ttl())
            .await?;

        Ok(LoginResponse {
            user,
            session,
            callback: String::new(),
        })
    }

    /// Where to send the browser for third-party login.
    pub fn third_party_login_url(&self) -> String {
        identity_provider::third_party_login_url(&self.settings.api)
    }

    /// The user behind a valid session signature.
    pub async fn current_user(&self, sig: &str) -> AuthResult<Option<UserRecord>> {
        if sig.is_empty() {
            return Ok(None);
        }
        let Some(session) = self.sessions.read_by_sig(sig).await? else {
            return Ok(None);
        };
        if !session.is_valid_at(unix_now()) {
            return Ok(None);
        }
        Ok(self.users.get_user_by_id(&session.uid).await?)
    }

    pub fn login_page(&self, target: &LoginTarget) -> LoginPage {
        LoginPage {
            can_register: self.settings.can_register,
            ldap_enabled: self.settings.ldap.enabled,
            sig: target
                .app_sig
                .as_ref()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            callback: target.callback.clone().unwrap_or_default(),
            shortcut: self.settings.shortcut.clone(),
        }
    }
}
