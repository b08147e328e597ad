//! HTTP forward-auth gateway
//!
//! Endpoints for reverse proxies (nginx `auth_request`, Traefik ForwardAuth,
//! Caddy `forward_auth`) plus the login form they redirect users to.
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/auth` | GET | 200 with `X-Auth-User` for a live session, else 401 or 302 |
//! | `/login` | GET | login form |
//! | `/do-login` | POST | verify credentials, set the session cookie |
//! | `/logout` | GET | drop the session and the cookie |
//! | `/health` | GET | liveness probe |

use crate::config::ProxyType;
use crate::orchestrator::{Credential, LoginOutcome, Orchestrator};
use axum::{
    Form, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session_id";

/// Response header naming the authenticated user
pub const AUTH_USER_HEADER: &str = "X-Auth-User";

/// Shared state of the gateway handlers
#[derive(Clone)]
pub struct GatewayState {
    orchestrator: Orchestrator,
    proxy_type: ProxyType,
    proxy_name: Arc<str>,
}

impl GatewayState {
    pub fn new(orchestrator: Orchestrator, proxy_type: ProxyType, proxy_name: &str) -> Self {
        Self {
            orchestrator,
            proxy_type,
            proxy_name: Arc::from(proxy_name),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LoginQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    next: String,
}

/// Build the gateway router
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/auth", get(auth_handler))
        .route("/login", get(login_handler))
        .route("/do-login", post(do_login_handler))
        .route("/logout", get(logout_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `Set-Cookie` value carrying a new session token
pub fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        token,
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that makes the browser drop the session cookie
pub fn expired_session_cookie() -> String {
    format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        SESSION_COOKIE
    )
}

/// Session token from the `Cookie` request header(s)
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Whether `next` stays on this site
///
/// Only absolute paths qualify; `//host` and `/\host` are read as
/// scheme-relative URLs by browsers. Control characters cannot appear in a
/// `Location` header.
pub fn is_local_redirect(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(char::is_control)
}

/// Escape text for HTML element content and quoted attribute values
pub fn html_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `<proto>://<host>` as seen by the client, from the proxy's forwarded headers
fn base_url(headers: &HeaderMap) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
    };

    let proto = header_str("x-forwarded-proto").unwrap_or("http");
    let host = header_str("x-forwarded-host")
        .or_else(|| header_str(header::HOST.as_str()))
        .unwrap_or("localhost");

    format!("{}://{}", proto, host)
}

fn login_url(base: &str, next: Option<&str>, error: Option<&str>) -> String {
    let query = LoginQuery {
        next: next.map(str::to_string),
        error: error.map(str::to_string),
    };

    match serde_urlencoded::to_string(&query) {
        Ok(query) if !query.is_empty() => format!("{}/login?{}", base, query),
        _ => format!("{}/login", base),
    }
}

fn redirect(status: StatusCode, location: String) -> Response {
    (status, [(header::LOCATION, location)]).into_response()
}

async fn auth_handler(
    State(state): State<GatewayState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let token = session_token(&headers);

    if let Some(username) = state.orchestrator.check(token.as_deref()).await {
        debug!(username = %username, "Authenticated request");
        return (StatusCode::OK, [(AUTH_USER_HEADER, username)], "OK").into_response();
    }

    if state.proxy_type.answers_unauthorized() {
        debug!(proxy_type = %state.proxy_type, "Unauthenticated request");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let original_uri = headers
        .get("x-forwarded-uri")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| uri.path());

    let location = login_url(&base_url(&headers), Some(original_uri), None);
    debug!(proxy_type = %state.proxy_type, location = %location, "Unauthenticated request, redirecting");
    redirect(StatusCode::FOUND, location)
}

async fn login_handler(
    State(state): State<GatewayState>,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let next = query
        .next
        .filter(|next| !next.is_empty())
        .unwrap_or_else(|| "/".to_string());

    Html(render_login_page(
        &state.proxy_name,
        &next,
        query.error.as_deref(),
    ))
}

async fn do_login_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let base = base_url(&headers);
    let next = if is_local_redirect(&form.next) {
        form.next
    } else {
        "/".to_string()
    };

    info!(username = %form.username, "Login attempt");

    let outcome = state
        .orchestrator
        .login(Credential::new(form.username, form.password))
        .await;

    match outcome {
        LoginOutcome::Authenticated { token, .. } => {
            let cookie = session_cookie(&token, state.orchestrator.sessions().timeout());
            (
                StatusCode::SEE_OTHER,
                [
                    (header::SET_COOKIE, cookie),
                    (header::LOCATION, format!("{}{}", base, next)),
                ],
            )
                .into_response()
        }
        failed => redirect(
            StatusCode::SEE_OTHER,
            login_url(&base, Some(next.as_str()), failed.reason()),
        ),
    }
}

async fn logout_handler(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        state.orchestrator.logout(&token).await;
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, expired_session_cookie()),
            (header::LOCATION, login_url(&base_url(&headers), None, None)),
        ],
    )
        .into_response()
}

async fn health_handler() -> &'static str {
    "OK"
}

fn render_login_page(proxy_name: &str, next: &str, error: Option<&str>) -> String {
    let proxy_name = html_escape(proxy_name);
    let error = error
        .filter(|error| !error.is_empty())
        .map(|error| format!("<div class=\"error\">{}</div>", html_escape(error)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Login - {proxy_name} RADIUS Auth</title>
    <style>
        body {{ font-family: Arial, sans-serif; background: #f0f0f0; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; }}
        .login-box {{ background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); width: 300px; }}
        h2 {{ margin-top: 0; color: #333; }}
        input {{ width: 100%; padding: 10px; margin: 10px 0; border: 1px solid #ddd; border-radius: 4px; box-sizing: border-box; }}
        button {{ width: 100%; padding: 10px; background: #007bff; color: white; border: none; border-radius: 4px; cursor: pointer; }}
        .error {{ color: #d9534f; margin-bottom: 10px; }}
    </style>
</head>
<body>
    <div class="login-box">
        <h2>{proxy_name} Login</h2>
        {error}
        <form method="POST" action="/do-login">
            <input type="hidden" name="next" value="{next}">
            <input type="text" name="username" placeholder="Username" required autofocus>
            <input type="password" name="password" placeholder="Password" required>
            <button type="submit">Login</button>
        </form>
    </div>
</body>
</html>
"#,
        proxy_name = proxy_name,
        error = error,
        next = html_escape(next),
    )
}
