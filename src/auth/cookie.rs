//! Cookie directives emitted by the login and logout paths.
//!
//! The core never touches a response object. It returns [`CookieDirective`]s
//! and the HTTP layer renders them as `Set-Cookie` headers.

use serde::Serialize;

/// Cookie carrying the SSO session signature.
pub const SIG_COOKIE: &str = "sig";

/// Cookie carrying the third-party access key.
pub const TOKEN_COOKIE: &str = "token";

/// A single cookie to set (or clear, when `max_age == 0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieDirective {
    pub name: String,
    pub value: String,
    /// Lifetime in seconds; 0 deletes the cookie.
    pub max_age: i64,
    pub path: String,
    /// Shared parent domain; `None` scopes the cookie to the issuing host.
    pub domain: Option<String>,
}

impl CookieDirective {
    /// The same cookie in both scopes: local path and shared cookie domain.
    ///
    /// The shared-domain copy is skipped when no cookie domain is configured.
    pub fn scoped_pair(name: &str, value: &str, max_age: i64, cookie_domain: &str) -> Vec<Self> {
        let mut cookies = vec![Self {
            name: name.to_string(),
            value: value.to_string(),
            max_age,
            path: "/".to_string(),
            domain: None,
        }];

        if !cookie_domain.is_empty() {
            cookies.push(Self {
                name: name.to_string(),
                value: value.to_string(),
                max_age,
                path: "/".to_string(),
                domain: Some(cookie_domain.to_string()),
            });
        }

        cookies
    }

    /// Both scopes of `name`, cleared.
    pub fn cleared_pair(name: &str, cookie_domain: &str) -> Vec<Self> {
        Self::scoped_pair(name, "", 0, cookie_domain)
    }

    pub fn is_removal(&self) -> bool {
        self.max_age <= 0
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(domain) = &self.domain {
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if self.is_removal() {
            out.push_str("; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        } else {
            out.push_str(&format!("; Max-Age={}", self.max_age));
        }
        out.push_str("; HttpOnly; SameSite=Lax");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_pair_has_both_scopes() {
        let cookies = CookieDirective::scoped_pair(SIG_COOKIE, "abc", 60, ".example.com");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].domain, None);
        assert_eq!(cookies[1].domain.as_deref(), Some(".example.com"));
        assert!(cookies.iter().all(|c| c.value == "abc" && c.max_age == 60));
    }

    #[test]
    fn test_scoped_pair_without_domain() {
        let cookies = CookieDirective::scoped_pair(TOKEN_COOKIE, "k", 60, "");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].path, "/");
    }

    #[test]
    fn test_header_rendering() {
        let cookies = CookieDirective::scoped_pair(SIG_COOKIE, "abc", 60, ".example.com");
        assert_eq!(
            cookies[0].to_header_value(),
            "sig=abc; Path=/; Max-Age=60; HttpOnly; SameSite=Lax"
        );
        assert_eq!(
            cookies[1].to_header_value(),
            "sig=abc; Path=/; Domain=.example.com; Max-Age=60; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_cleared_pair() {
        let cookies = CookieDirective::cleared_pair(SIG_COOKIE, ".example.com");
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.is_removal() && c.value.is_empty()));
        assert!(cookies[0].to_header_value().contains("Max-Age=0; Expires=Thu, 01 Jan 1970"));
    }
}
