//! Login flow: session check, credential verification, session creation
//!
//! The orchestrator holds no per-request state. Each call walks the
//! [`AuthState`] machine from the top:
//!
//! ```text
//! Unauthenticated ──credentials──▶ CredentialsSubmitted ──▶ Authenticating
//!                                                              │
//!                           ┌──────────────┬───────────────────┤
//!                           ▼              ▼                   ▼
//!                    Authenticated     Rejected           ServiceError
//! ```

use crate::client::RadiusClient;
use crate::error::{AuthError, AuthResult};
use crate::session::SessionStore;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Message shown when the backend refuses the credentials
pub const REJECTED_REASON: &str = "Invalid username or password";

/// Message shown when the backend could not give an answer
pub const SERVICE_ERROR_REASON: &str = "Authentication service error";

/// Checks a username/password pair against an authentication backend
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Ok(true)` when accepted, `Ok(false)` when refused
    async fn verify(&self, username: &str, password: &str) -> AuthResult<bool>;
}

#[async_trait]
impl CredentialVerifier for RadiusClient {
    async fn verify(&self, username: &str, password: &str) -> AuthResult<bool> {
        self.authenticate(username, password).await
    }
}

/// Username and password submitted by the user
///
/// Never stored. `Debug` does not print the password.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { username: String, token: String },
    Rejected,
    ServiceError,
}

impl LoginOutcome {
    /// User-facing reason for a failed login
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            LoginOutcome::Authenticated { .. } => None,
            LoginOutcome::Rejected => Some(REJECTED_REASON),
            LoginOutcome::ServiceError => Some(SERVICE_ERROR_REASON),
        }
    }
}

/// Where a request stands in the login flow
///
/// `CredentialsSubmitted` and `Authenticating` are transient; [`Orchestrator::resolve`]
/// only returns the settled states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    CredentialsSubmitted,
    Authenticating,
    Authenticated { username: String, token: String },
    Rejected,
    ServiceError,
}

impl From<LoginOutcome> for AuthState {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated { username, token } => {
                AuthState::Authenticated { username, token }
            }
            LoginOutcome::Rejected => AuthState::Rejected,
            LoginOutcome::ServiceError => AuthState::ServiceError,
        }
    }
}

/// Ties a [`CredentialVerifier`] to a [`SessionStore`]
#[derive(Clone)]
pub struct Orchestrator {
    verifier: Arc<dyn CredentialVerifier>,
    sessions: Arc<SessionStore>,
}

impl Orchestrator {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, sessions: Arc<SessionStore>) -> Self {
        Self { verifier, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Username behind `token`, if it names a live session
    pub async fn check(&self, token: Option<&str>) -> Option<String> {
        match token {
            Some(token) if !token.is_empty() => self.sessions.validate(token).await,
            _ => None,
        }
    }

    /// Verify `credential` and open a session on success
    pub async fn login(&self, credential: Credential) -> LoginOutcome {
        let Credential { username, password } = credential;

        match self.verifier.verify(&username, &password).await {
            Ok(true) => {
                let token = self.sessions.create(&username).await;
                info!(username = %username, "Login succeeded");
                LoginOutcome::Authenticated { username, token }
            }
            Ok(false) => {
                info!(username = %username, "Login rejected");
                LoginOutcome::Rejected
            }
            Err(e) => {
                log_service_error(&username, &e);
                LoginOutcome::ServiceError
            }
        }
    }

    /// End the session behind `token`
    pub async fn logout(&self, token: &str) {
        self.sessions.delete(token).await;
    }

    /// Run the whole state machine for one request
    ///
    /// A live session wins over submitted credentials; without either the
    /// request stays `Unauthenticated`.
    pub async fn resolve(&self, token: Option<&str>, credential: Option<Credential>) -> AuthState {
        if let Some(username) = self.check(token).await {
            return AuthState::Authenticated {
                username,
                token: token.unwrap_or_default().to_string(),
            };
        }

        match credential {
            Some(credential) => self.login(credential).await.into(),
            None => AuthState::Unauthenticated,
        }
    }
}

fn log_service_error(username: &str, err: &AuthError) {
    warn!(
        username = %username,
        error = %err,
        retryable = err.is_retryable(),
        "Login failed: authentication service error"
    );
}
