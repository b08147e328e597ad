//! RADIUS Forward-Auth Backend
//!
//! Authenticates users against a RADIUS server (PAP over UDP) and keeps the
//! result in an in-memory session store, so a reverse proxy can ask "is this
//! request logged in?" without a RADIUS round trip per request.
//!
//! # Components
//!
//! - [`RadiusClient`]: one Access-Request exchange with retries and a hard deadline
//! - [`SessionStore`]: opaque tokens with absolute expiry and a background sweeper
//! - [`Orchestrator`]: session check, login and logout on top of the two
//! - [`gateway`]: axum routes for nginx, Traefik and Caddy forward auth
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_auth::{ClientConfig, Credential, LoginOutcome, Orchestrator, RadiusClient, SessionStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = RadiusClient::new(ClientConfig::new("radius.example", 1812, "secret"));
//!     let sessions = Arc::new(SessionStore::new(Duration::from_secs(3600)));
//!     let orchestrator = Orchestrator::new(Arc::new(client), sessions);
//!
//!     if let LoginOutcome::Authenticated { token, .. } =
//!         orchestrator.login(Credential::new("alice", "password")).await
//!     {
//!         assert!(orchestrator.check(Some(&token)).await.is_some());
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod session;

pub use client::{AccessRequest, ClientConfig, RadiusClient};
pub use config::{Config, ConfigError, ProxyType};
pub use error::{AuthError, AuthResult};
pub use gateway::{GatewayState, router, session_cookie};
pub use orchestrator::{AuthState, Credential, CredentialVerifier, LoginOutcome, Orchestrator};
pub use session::{Session, SessionError, SessionStore};
