//! Error types for RADIUS authentication

use thiserror::Error;

/// Failure of a RADIUS exchange
///
/// A well-formed Access-Reject is not an error; it is `Ok(false)`.
/// Messages never contain the shared secret, the password or packet bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Backend unreachable, no reply before the deadline, or caller cancelled
    #[error("RADIUS service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Reply failed authenticator checks or could not be encoded/decoded
    #[error("RADIUS protocol error: {0}")]
    Protocol(String),
}

impl AuthError {
    /// Whether the caller may reasonably try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}

impl From<radius_proto::PacketError> for AuthError {
    fn from(err: radius_proto::PacketError) -> Self {
        AuthError::Protocol(err.to_string())
    }
}

/// Result type for RADIUS authentication
pub type AuthResult<T> = Result<T, AuthError>;
