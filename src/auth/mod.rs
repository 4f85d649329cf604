//! Authentication strategies and SSO sessions.
//!
//! Three strategies produce an [`AuthOutcome`]:
//!
//! - **Credential**: name + salted password hash stored locally
//! - **Directory**: bind against an external directory, auto-provisioning the user
//! - **Token exchange**: one-time token from a third-party identity provider,
//!   which also supplies the user's role
//!
//! Every outcome goes through the [`SessionIssuer`], which writes a session
//! row keyed either by a fresh SSO signature (set as the `sig` cookie) or by
//! an application's own signature. [`AuthService`] ties the pieces together
//! and adds session checks, logout and registration.
//!
//! ## Usage
//!
//! ```ignore
//! let service = AuthService::new(db, settings, provider, None);
//! let response = service.login(LoginForm {
//!     name: "alice".into(),
//!     password: "secret".into(),
//!     ..Default::default()
//! }).await?;
//! for cookie in &response.session.cookies {
//!     println!("Set-Cookie: {}", cookie.to_header_value());
//! }
//! ```

mod cookie;
mod credential;
pub mod directory;
mod error;
pub mod identity_provider;
mod issuer;
mod password;
mod role;
mod service;
mod session_store;
mod token_exchange;
mod user_store;

pub use cookie::{CookieDirective, SIG_COOKIE, TOKEN_COOKIE};
pub use credential::CredentialAuthenticator;
pub use directory::{DirectoryAuthenticator, DirectoryBind, split_principal};
#[cfg(feature = "ldap")]
pub use directory::LdapBind;
pub use error::{AuthError, AuthResult};
pub use identity_provider::{
    AccessGrant, HttpIdentityProvider, IdentityProvider, ProviderEnvelope, third_party_login_url,
};
pub use issuer::{AuthOutcome, IssuedSession, LoginTarget, SessionIssuer, SessionScope, unix_now};
pub use password::{hash_password, verify_password};
pub use service::{
    AuthService, LoginForm, LoginPage, LoginResponse, LogoutOutcome, RegisterForm, SessionCheck,
    TokenLogin, is_username_valid,
};
pub use session_store::SessionStore;
pub use token_exchange::TokenExchangeAuthenticator;
pub use user_store::UserStore;
