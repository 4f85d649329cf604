// HTTP adapter for the SSO endpoints

use anyhow::Result;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{
    AuthError, AuthService, CookieDirective, LoginForm, LoginTarget, RegisterForm, SIG_COOKIE,
    SessionCheck, TOKEN_COOKIE, TokenLogin,
};

pub type AppState = Arc<AuthService>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", get(login_get).post(login_post))
        .route("/auth/login/{token}", get(login_with_token))
        .route("/auth/logout", get(logout))
        .route("/auth/register", post(register))
        .route("/auth/third-party", post(third_party))
        .route("/me/info", get(me_info))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind `bind` and serve the SSO endpoints until the listener closes.
pub async fn serve(service: AuthService, bind: &str) -> Result<()> {
    let router = create_router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("SSO server listening on http://{}", bind);
    axum::serve(listener, router).await?;
    Ok(())
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "msg": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct TargetParams {
    #[serde(default)]
    sig: Option<String>,
    #[serde(default)]
    callback: Option<String>,
}

impl TargetParams {
    fn target(&self) -> LoginTarget {
        LoginTarget::new(self.sig.as_deref(), self.callback.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
    /// Use the directory instead of the local password.
    #[serde(default)]
    ldap: bool,
    #[serde(default)]
    sig: Option<String>,
    #[serde(default)]
    callback: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterParams {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    repeat_password: String,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some((k, v)) = p.split_once('=') {
            if k == name {
                return Some(v.to_string());
            }
        }
    }
    None
}

fn with_cookies(mut response: Response, cookies: &[CookieDirective]) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_header_value()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Dropping unrenderable cookie {}: {}", cookie.name, e),
        }
    }
    response
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => AuthError::validation("invalid redirect target").into_response(),
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn login_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TargetParams>,
) -> Result<Response, AuthError> {
    let sig = parse_cookie(&headers, SIG_COOKIE);
    match state.check_session(sig.as_deref(), params.target()).await? {
        SessionCheck::LoginRequired(page) => Ok(Json(page).into_response()),
        SessionCheck::Redirect(location) => Ok(found(&location)),
    }
}

async fn login_post(
    State(state): State<AppState>,
    Form(params): Form<LoginParams>,
) -> Result<Response, AuthError> {
    let form = LoginForm {
        target: LoginTarget::new(params.sig.as_deref(), params.callback.as_deref()),
        name: params.name,
        password: params.password,
        use_directory: params.ldap,
    };
    let response = state.login(form).await?;
    Ok(with_cookies(
        Json(json!({ "msg": "", "data": response.callback })).into_response(),
        &response.session.cookies,
    ))
}

async fn login_with_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(params): Query<TargetParams>,
) -> Result<Response, AuthError> {
    match state.login_with_token(&token, params.target()).await? {
        TokenLogin::LoggedIn {
            cookies, redirect, ..
        } => Ok(with_cookies(found(&redirect), &cookies)),
        TokenLogin::LoginRequired(page) => Ok(Json(page).into_response()),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AuthError> {
    let sig = parse_cookie(&headers, SIG_COOKIE).unwrap_or_default();
    let Some(user) = state.current_user(&sig).await? else {
        return Ok(found(&state.settings().login_path));
    };

    let token = parse_cookie(&headers, TOKEN_COOKIE);
    let outcome = state.logout(&user, token.as_deref()).await?;
    Ok(with_cookies(found(&outcome.redirect), &outcome.cookies))
}

async fn register(
    State(state): State<AppState>,
    Form(params): Form<RegisterParams>,
) -> Result<Response, AuthError> {
    let response = state
        .register(RegisterForm {
            name: params.name,
            password: params.password,
            repeat_password: params.repeat_password,
        })
        .await?;
    Ok(with_cookies(
        Json(json!({ "msg": "" })).into_response(),
        &response.session.cookies,
    ))
}

async fn third_party(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "msg": "", "data": state.third_party_login_url() }))
}

async fn me_info(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AuthError> {
    let sig = parse_cookie(&headers, SIG_COOKIE).unwrap_or_default();
    match state.current_user(&sig).await? {
        Some(user) => Ok(Json(json!({
            "name": user.name,
            "email": user.email,
            "role": user.role,
        }))
        .into_response()),
        None => Ok(found(&state.settings().login_path)),
    }
}
