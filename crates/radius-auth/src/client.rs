//! RADIUS authentication client
//!
//! Sends one PAP Access-Request per [`RadiusClient::authenticate`] call and
//! waits for the matching Access-Accept / Access-Reject.
//!
//! # Exchange
//!
//! ```text
//! build request ──→ send ──→ wait retry_interval ──→ resend ... (max_attempts)
//!                     │                                   │
//!                     └──────── wait until deadline ◀─────┘
//! ```
//!
//! Replies carrying another identifier are dropped without ending the wait.
//! A reply with the right identifier must decode cleanly and pass the
//! Response Authenticator check (and the Message-Authenticator check when
//! present); otherwise the exchange fails with [`AuthError::Protocol`] and is
//! not retried.
//!
//! The UDP socket lives inside the exchange future. Cancelling, timing out or
//! dropping the future closes it; nothing keeps sending afterwards.

use crate::error::{AuthError, AuthResult};
use radius_proto::auth::{encrypt_user_password, generate_request_authenticator};
use radius_proto::message_auth::{sign_message_authenticator, verify_packet_message_authenticator};
use radius_proto::{Attribute, AttributeType, Code, Packet, verify_response_authenticator};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest deadline one exchange may be given
pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

/// RADIUS client settings
#[derive(Clone)]
pub struct ClientConfig {
    /// RADIUS server host name or IP address
    pub server_host: String,
    /// RADIUS server port (1812 by default)
    pub server_port: u16,
    /// Shared secret
    pub secret: Vec<u8>,
    /// NAS-Identifier sent with every request
    pub nas_identifier: String,
    /// Hard deadline for one exchange
    pub timeout: Duration,
    /// Wait before resending an unanswered request
    pub retry_interval: Duration,
    /// Number of times one request may be sent
    pub max_attempts: u8,
    /// Unmatched replies tolerated before the exchange is abandoned
    pub max_discarded_replies: usize,
}

impl ClientConfig {
    pub fn new(server_host: impl Into<String>, server_port: u16, secret: impl Into<Vec<u8>>) -> Self {
        ClientConfig {
            server_host: server_host.into(),
            server_port,
            secret: secret.into(),
            nas_identifier: "auth-backend".to_string(),
            timeout: Duration::from_secs(10),
            retry_interval: Duration::from_secs(3),
            max_attempts: 3,
            max_discarded_replies: 32,
        }
    }

    pub fn with_nas_identifier(mut self, nas_identifier: impl Into<String>) -> Self {
        self.nas_identifier = nas_identifier.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u8) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_discarded_replies(mut self, max_discarded_replies: usize) -> Self {
        self.max_discarded_replies = max_discarded_replies;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("secret", &"<redacted>")
            .field("nas_identifier", &self.nas_identifier)
            .field("timeout", &self.timeout)
            .field("retry_interval", &self.retry_interval)
            .field("max_attempts", &self.max_attempts)
            .field("max_discarded_replies", &self.max_discarded_replies)
            .finish()
    }
}

/// A signed Access-Request ready to be sent
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub packet: Packet,
    pub bytes: Vec<u8>,
}

impl AccessRequest {
    pub fn identifier(&self) -> u8 {
        self.packet.identifier
    }

    pub fn authenticator(&self) -> &[u8; 16] {
        &self.packet.authenticator
    }
}

/// What to do with one received datagram
enum Reply {
    Verdict(bool),
    Discard(&'static str),
}

/// RADIUS client
///
/// Cheap to clone; clones share the configuration.
#[derive(Debug, Clone)]
pub struct RadiusClient {
    config: Arc<ClientConfig>,
}

impl RadiusClient {
    /// `timeout` and `retry_interval` are capped at [`MAX_TIMEOUT`]
    pub fn new(mut config: ClientConfig) -> Self {
        config.timeout = config.timeout.min(MAX_TIMEOUT);
        config.retry_interval = config.retry_interval.min(MAX_TIMEOUT);
        RadiusClient {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Authenticate `username` with `password`
    ///
    /// `Ok(true)` on Access-Accept, `Ok(false)` on Access-Reject or
    /// Access-Challenge.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<bool> {
        self.authenticate_with_cancel(username, password, CancellationToken::new())
            .await
    }

    /// Like [`authenticate`](Self::authenticate), abandoning the exchange
    /// with [`AuthError::ServiceUnavailable`] once `cancel` fires
    pub async fn authenticate_with_cancel(
        &self,
        username: &str,
        password: &str,
        cancel: CancellationToken,
    ) -> AuthResult<bool> {
        let request = self.build_request(username, password)?;
        let deadline = Instant::now() + self.config.timeout;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(AuthError::ServiceUnavailable("authentication cancelled".to_string()))
            }
            outcome = timeout_at(deadline, self.exchange(&request, deadline)) => {
                outcome.unwrap_or_else(|_| Err(self.no_reply()))
            }
        };

        match &result {
            Ok(accepted) => info!(
                username = %username,
                identifier = request.identifier(),
                accepted = *accepted,
                "RADIUS exchange completed"
            ),
            Err(e) => warn!(
                username = %username,
                identifier = request.identifier(),
                error = %e,
                "RADIUS exchange failed"
            ),
        }

        result
    }

    /// Build and sign an Access-Request
    ///
    /// The Request Authenticator is drawn first because it salts the hidden
    /// User-Password. The Message-Authenticator is computed over the packet
    /// with a zeroed placeholder and then written into a rebuilt attribute list.
    pub fn build_request(&self, username: &str, password: &str) -> AuthResult<AccessRequest> {
        let secret = &self.config.secret;
        let request_authenticator = generate_request_authenticator();
        let identifier: u8 = rand::random();

        let mut packet = Packet::new(Code::AccessRequest, identifier, request_authenticator);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, username)?);
        packet.add_attribute(Attribute::new(
            AttributeType::UserPassword as u8,
            encrypt_user_password(password, secret, &request_authenticator)?,
        )?);
        packet.add_attribute(Attribute::string(
            AttributeType::NasIdentifier as u8,
            self.config.nas_identifier.as_str(),
        )?);
        packet.add_attribute(Attribute::message_authenticator([0u8; 16]));

        let packet = sign_message_authenticator(&packet, secret)?;
        let bytes = packet.encode()?;

        Ok(AccessRequest { packet, bytes })
    }

    async fn exchange(&self, request: &AccessRequest, deadline: Instant) -> AuthResult<bool> {
        let server = self.resolve_server().await?;
        let socket = connect(server).await?;

        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];
        let mut attempts: u8 = 0;
        let mut discarded: usize = 0;

        loop {
            if attempts < self.config.max_attempts {
                socket.send(&request.bytes).await.map_err(unavailable)?;
                attempts += 1;
                debug!(
                    server = %server,
                    identifier = request.identifier(),
                    attempt = attempts,
                    "Access-Request sent"
                );
            }

            let wait_until = if attempts < self.config.max_attempts {
                (Instant::now() + self.config.retry_interval).min(deadline)
            } else {
                deadline
            };

            loop {
                let len = match timeout_at(wait_until, socket.recv(&mut buf)).await {
                    Ok(received) => received.map_err(unavailable)?,
                    Err(_) => break,
                };

                match self.classify(&buf[..len], request)? {
                    Reply::Verdict(accepted) => return Ok(accepted),
                    Reply::Discard(reason) => {
                        discarded += 1;
                        warn!(
                            server = %server,
                            identifier = request.identifier(),
                            discarded = discarded,
                            reason = reason,
                            "Discarded RADIUS reply"
                        );
                        if discarded > self.config.max_discarded_replies {
                            return Err(AuthError::Protocol(format!(
                                "more than {} unmatched replies",
                                self.config.max_discarded_replies
                            )));
                        }
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(self.no_reply());
            }
        }
    }

    /// Check one datagram against the outstanding request
    fn classify(&self, data: &[u8], request: &AccessRequest) -> AuthResult<Reply> {
        if data.len() < 2 || data[1] != request.identifier() {
            return Ok(Reply::Discard("identifier mismatch"));
        }

        let response = Packet::decode(data)?;

        if !response.code.is_access_response() {
            return Err(AuthError::Protocol(format!(
                "unexpected reply code {}",
                response.code.as_u8()
            )));
        }

        let secret = &self.config.secret;
        if !verify_response_authenticator(&response, request.authenticator(), secret) {
            return Err(AuthError::Protocol(
                "Response Authenticator mismatch".to_string(),
            ));
        }

        if verify_packet_message_authenticator(&response, request.authenticator(), secret)
            == Some(false)
        {
            return Err(AuthError::Protocol(
                "Message-Authenticator mismatch".to_string(),
            ));
        }

        for message in response.find_all_attributes(AttributeType::ReplyMessage as u8) {
            if let Ok(text) = message.as_string() {
                debug!(code = ?response.code, message = %text, "Reply-Message");
            }
        }

        Ok(Reply::Verdict(response.code == Code::AccessAccept))
    }

    async fn resolve_server(&self) -> AuthResult<SocketAddr> {
        let host = self.config.server_host.as_str();
        let mut addrs = tokio::net::lookup_host((host, self.config.server_port))
            .await
            .map_err(|e| {
                AuthError::ServiceUnavailable(format!("cannot resolve RADIUS server {}: {}", host, e))
            })?;

        addrs.next().ok_or_else(|| {
            AuthError::ServiceUnavailable(format!("RADIUS server {} has no address", host))
        })
    }

    fn no_reply(&self) -> AuthError {
        AuthError::ServiceUnavailable(format!(
            "no reply from RADIUS server within {:?}",
            self.config.timeout
        ))
    }
}

async fn connect(server: SocketAddr) -> AuthResult<UdpSocket> {
    let local: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local).await.map_err(unavailable)?;
    socket.connect(server).await.map_err(unavailable)?;
    Ok(socket)
}

fn unavailable(err: std::io::Error) -> AuthError {
    AuthError::ServiceUnavailable(format!("network error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use radius_proto::{decrypt_user_password, verify_message_authenticator};

    fn client() -> RadiusClient {
        RadiusClient::new(
            ClientConfig::new("127.0.0.1", 1812, "testing123").with_nas_identifier("gateway-1"),
        )
    }

    #[test]
    fn test_build_request_attributes() {
        let request = client().build_request("alice", "wonderland").unwrap();
        let decoded = Packet::decode(&request.bytes).unwrap();

        assert_eq!(decoded, request.packet);
        assert_eq!(decoded.code, Code::AccessRequest);

        let types: Vec<u8> = decoded.attributes.iter().map(|a| a.attr_type).collect();
        assert_eq!(types, vec![1, 2, 32, 80]);

        let username = decoded.find_attribute(AttributeType::UserName as u8).unwrap();
        assert_eq!(username.as_string().unwrap(), "alice");

        let nas = decoded.find_attribute(AttributeType::NasIdentifier as u8).unwrap();
        assert_eq!(nas.as_string().unwrap(), "gateway-1");
    }

    #[test]
    fn test_build_request_password_is_hidden() {
        let request = client().build_request("alice", "wonderland").unwrap();
        let hidden = request
            .packet
            .find_attribute(AttributeType::UserPassword as u8)
            .unwrap();

        assert_eq!(hidden.value.len(), 16);
        assert!(!hidden.value.windows(10).any(|w| w == b"wonderland"));
        assert_eq!(
            decrypt_user_password(&hidden.value, b"testing123", request.authenticator()).unwrap(),
            "wonderland"
        );
    }

    #[test]
    fn test_build_request_message_authenticator_verifies() {
        let request = client().build_request("alice", "wonderland").unwrap();
        let offset = request.bytes.len() - 16;

        assert_eq!(request.bytes[offset - 2], 80);
        assert_eq!(request.bytes[offset - 1], 18);
        assert!(verify_message_authenticator(&request.bytes, b"testing123", offset));
        assert!(!verify_message_authenticator(&request.bytes, b"guess", offset));
    }

    #[test]
    fn test_build_request_fresh_authenticator() {
        let client = client();
        let first = client.build_request("alice", "pw").unwrap();
        let second = client.build_request("alice", "pw").unwrap();
        assert_ne!(first.authenticator(), second.authenticator());
    }

    #[test]
    fn test_build_request_rejects_oversized_password() {
        let err = client().build_request("alice", &"p".repeat(200)).unwrap_err();
        assert!(matches!(err, AuthError::Protocol(_)));
        assert!(!err.to_string().contains("ppp"));
    }

    #[test]
    fn test_new_caps_durations() {
        let client = RadiusClient::new(
            ClientConfig::new("127.0.0.1", 1812, "testing123")
                .with_timeout(Duration::MAX)
                .with_retry_interval(Duration::MAX),
        );
        assert_eq!(client.config().timeout, MAX_TIMEOUT);
        assert_eq!(client.config().retry_interval, MAX_TIMEOUT);
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("testing123"));
    }

    #[test]
    fn test_classify_discards_other_identifier() {
        let client = client();
        let request = client.build_request("alice", "pw").unwrap();
        let mut reply = Packet::new(
            Code::AccessAccept,
            request.identifier().wrapping_add(1),
            [0u8; 16],
        )
        .encode()
        .unwrap();
        assert!(matches!(
            client.classify(&reply, &request),
            Ok(Reply::Discard(_))
        ));

        reply.truncate(1);
        assert!(matches!(
            client.classify(&reply, &request),
            Ok(Reply::Discard(_))
        ));
    }

    #[test]
    fn test_classify_rejects_request_echo() {
        let client = client();
        let request = client.build_request("alice", "pw").unwrap();
        assert!(matches!(
            client.classify(&request.bytes, &request),
            Err(AuthError::Protocol(_))
        ));
    }
}
