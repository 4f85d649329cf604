use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, env, fs, path::PathBuf};

/// Session lifetime used by every login path: 30 days.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 3600 * 24 * 30;

/// Immutable settings shared by every authenticator.
///
/// Built once at startup and handed to each component by value or `Arc`;
/// nothing in the crate reads these from process-wide globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Secret prepended to passwords before hashing.
    #[serde(default)]
    pub salt: String,
    /// Shared parent domain for the cross-application cookie scope.
    #[serde(default)]
    pub cookie_domain: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: i64,
    #[serde(default)]
    pub can_register: bool,
    #[serde(default)]
    pub ldap: LdapSettings,
    #[serde(default)]
    pub api: ThirdPartyApi,
    /// Opaque shortcut links forwarded to the login page.
    #[serde(default)]
    pub shortcut: BTreeMap<String, String>,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Directory address, e.g. `ldap://ldap.example.com:389`.
    #[serde(default)]
    pub addr: String,
}

/// Endpoints of the third-party identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThirdPartyApi {
    /// Service key sent along with the one-time token.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub logout: String,
    #[serde(default)]
    pub login: String,
    /// Where the provider sends the browser back after its own login page.
    #[serde(default)]
    pub redirect: String,
}

fn default_session_ttl() -> i64 {
    DEFAULT_SESSION_TTL_SECONDS
}

fn default_landing_path() -> String {
    "/me/info".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            salt: String::new(),
            cookie_domain: String::new(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            can_register: false,
            ldap: LdapSettings::default(),
            api: ThirdPartyApi::default(),
            shortcut: BTreeMap::new(),
            landing_path: default_landing_path(),
            login_path: default_login_path(),
        }
    }
}

impl AuthSettings {
    /// Parse settings from a JSON document, expanding `${VAR}` placeholders.
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let settings = serde_json::from_value(expand_value(value))?;
        Ok(settings)
    }

    /// Load settings from the resolved config file path.
    pub fn load() -> anyhow::Result<Self> {
        let path = resolve_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(p) = env::var("UIC_CONFIG") {
        return Ok(PathBuf::from(p));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("uic").join("uic.json");
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let candidate = PathBuf::from("uic.json");
    if candidate.exists() {
        return Ok(candidate);
    }

    Err(anyhow::anyhow!(
        "Could not find uic.json (set UIC_CONFIG or create ./uic.json)"
    ))
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(expand_env_vars(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(expand_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, expand_value(v)))
                .collect(),
        ),
        other => other,
    }
}
