//! Error taxonomy shared by every authentication path.

use std::fmt;

use axum::http::StatusCode;

/// Authentication errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Blank required field, malformed username, closed registration
    Validation(String),
    /// No such user
    NotFound(String),
    /// Wrong password, failed bind, or rejected third-party token
    InvalidCredential,
    /// Remote call transport or parse failure
    AuthProvider(String),
    /// Store write or read failure
    Persistence(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{}", msg),
            Self::NotFound(name) => write!(f, "no such user: {}", name),
            Self::InvalidCredential => write!(f, "name or password error"),
            Self::AuthProvider(msg) => write!(f, "Auth provider error: {}", msg),
            Self::Persistence(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<surrealdb::Error> for AuthError {
    fn from(err: surrealdb::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status used when this error reaches the HTTP adapter.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::InvalidCredential => StatusCode::UNAUTHORIZED,
            Self::AuthProvider(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::validation("name or password is blank").to_string(),
            "name or password is blank"
        );
        assert_eq!(AuthError::NotFound("bob".into()).to_string(), "no such user: bob");
        assert_eq!(AuthError::InvalidCredential.to_string(), "name or password error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::InvalidCredential.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::NotFound("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::AuthProvider("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AuthError::Persistence("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_anyhow_maps_to_persistence() {
        let err: AuthError = anyhow::anyhow!("insert failed").into();
        assert!(matches!(err, AuthError::Persistence(msg) if msg == "insert failed"));
    }
}
