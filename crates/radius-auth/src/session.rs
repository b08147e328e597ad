//! In-memory session store
//!
//! Maps opaque bearer tokens to the username that logged in and an absolute
//! expiry. Entries never slide: a session created with a one hour timeout is
//! gone one hour later no matter how often it is used.
//!
//! # Thread Safety
//!
//! One `HashMap` behind a `tokio::sync::RwLock`. Lookups take the read lock,
//! `create`, `delete` and sweeps take the write lock.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Random bytes per session token
pub const TOKEN_BYTES: usize = 32;

/// Longest session lifetime; also the largest cookie Max-Age browsers accept
pub const MAX_SESSION_TIMEOUT: Duration = Duration::from_secs(i32::MAX as u64);

/// Default interval between background sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Why a token did not resolve to a session
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("session expired")]
    Expired,
}

/// A logged-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub expires_at: Instant,
}

impl Session {
    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Token → session map with a fixed lifetime per entry
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    timeout: Duration,
}

impl SessionStore {
    /// `timeout` is capped at [`MAX_SESSION_TIMEOUT`]
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timeout: timeout.min(MAX_SESSION_TIMEOUT),
        }
    }

    /// Session lifetime, also used as the cookie Max-Age
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a session for `username` and return its token
    pub async fn create(&self, username: &str) -> String {
        let session = Session {
            username: username.to_string(),
            expires_at: Instant::now() + self.timeout,
        };

        let mut sessions = self.sessions.write().await;
        // Redraw on collision
        let token = loop {
            let candidate = generate_token();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        sessions.insert(token.clone(), session);
        drop(sessions);

        debug!(username = %username, "Session created");
        token
    }

    /// Username for `token` if the session exists and has not expired
    pub async fn validate(&self, token: &str) -> Option<String> {
        match self.lookup(token).await {
            Ok(username) => Some(username),
            Err(reason) => {
                debug!(reason = %reason, "Session rejected");
                None
            }
        }
    }

    /// Like [`validate`](Self::validate), telling a missing token from an
    /// expired one
    pub async fn lookup(&self, token: &str) -> Result<String, SessionError> {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        let session = sessions.get(token).ok_or(SessionError::NotFound)?;

        if session.is_valid_at(now) {
            Ok(session.username.clone())
        } else {
            Err(SessionError::Expired)
        }
    }

    /// Remove a session; unknown tokens are ignored
    pub async fn delete(&self, token: &str) {
        let removed = self.sessions.write().await.remove(token);
        if let Some(session) = removed {
            debug!(username = %session.username, "Session deleted");
        }
    }

    /// Remove every expired session, returning how many were dropped
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_valid_at(now));
        before - sessions.len()
    }

    /// Number of stored sessions (including expired ones not yet swept)
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Sweep expired sessions every `interval` until `shutdown` is cancelled
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs(),
                "Session sweeper started"
            );

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.cancelled() => {
                        info!("Session sweeper shutting down");
                        return;
                    }
                }

                let removed = store.sweep_expired().await;
                if removed > 0 {
                    info!(removed = removed, "Expired sessions swept");
                }
            }
        })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
