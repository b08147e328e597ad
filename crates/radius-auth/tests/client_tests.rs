//! End-to-end tests of the RADIUS client against an in-process mock server

mod common;

use common::{Behavior, MockRadiusServer, SECRET};
use radius_auth::{AuthError, ClientConfig, RadiusClient};
use radius_proto::{Packet, verify_message_authenticator};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_access_accept() {
    let server = MockRadiusServer::start(Behavior::Verify).await;
    let client = RadiusClient::new(server.client_config());

    let result = client.authenticate("alice", "wonderland").await;
    assert_eq!(result, Ok(true));
    assert_eq!(server.received().len(), 1);
}

#[tokio::test]
async fn test_access_reject() {
    // Backend refuses eve/wrong
    let server = MockRadiusServer::start(Behavior::Verify).await;
    let client = RadiusClient::new(server.client_config());

    assert_eq!(client.authenticate("eve", "wrong").await, Ok(false));
}

#[tokio::test]
async fn test_access_challenge_is_not_success() {
    let server = MockRadiusServer::start(Behavior::Challenge).await;
    let client = RadiusClient::new(server.client_config());

    assert_eq!(client.authenticate("alice", "wonderland").await, Ok(false));
}

#[tokio::test]
async fn test_tampered_response_authenticator() {
    let server = MockRadiusServer::start(Behavior::TamperedAuthenticator).await;
    let client = RadiusClient::new(server.client_config());

    let err = client.authenticate("alice", "wonderland").await.unwrap_err();
    assert!(matches!(err, AuthError::Protocol(_)), "got {:?}", err);
    assert!(!err.is_retryable());
    // Not retried
    assert_eq!(server.received().len(), 1);
}

#[tokio::test]
async fn test_bad_message_authenticator() {
    let server = MockRadiusServer::start(Behavior::BadMessageAuthenticator).await;
    let client = RadiusClient::new(server.client_config());

    let err = client.authenticate("alice", "wonderland").await.unwrap_err();
    assert!(matches!(err, AuthError::Protocol(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unbounded_durations_do_not_panic() {
    let server = MockRadiusServer::start(Behavior::Verify).await;
    let client = RadiusClient::new(
        server
            .client_config()
            .with_timeout(Duration::MAX)
            .with_retry_interval(Duration::MAX),
    );

    assert_eq!(client.authenticate("alice", "wonderland").await, Ok(true));
}

#[tokio::test]
async fn test_mismatched_identifier_is_ignored() {
    let server = MockRadiusServer::start(Behavior::MismatchedIdFirst).await;
    let client = RadiusClient::new(server.client_config());

    assert_eq!(client.authenticate("alice", "wonderland").await, Ok(true));
    assert_eq!(server.received().len(), 1);
}

#[tokio::test]
async fn test_junk_reply_cap() {
    let server = MockRadiusServer::start(Behavior::Junk(5)).await;
    let client = RadiusClient::new(server.client_config().with_max_discarded_replies(3));

    let err = client.authenticate("alice", "wonderland").await.unwrap_err();
    assert!(matches!(err, AuthError::Protocol(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_retries_resend_identical_datagram() {
    let server = MockRadiusServer::start(Behavior::IgnoreFirst(2)).await;
    let client = RadiusClient::new(server.client_config());

    assert_eq!(client.authenticate("alice", "wonderland").await, Ok(true));

    let received = server.received();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|datagram| *datagram == received[0]));
}

#[tokio::test]
async fn test_outgoing_message_authenticator_verifies() {
    let server = MockRadiusServer::start(Behavior::Verify).await;
    let client = RadiusClient::new(server.client_config());
    client.authenticate("alice", "wonderland").await.unwrap();

    let datagram = &server.received()[0];
    let packet = Packet::decode(datagram).unwrap();
    let offset = datagram.len() - 16;

    assert_eq!(packet.attributes.last().map(|a| a.attr_type), Some(80));
    assert!(verify_message_authenticator(datagram, SECRET, offset));
}

#[tokio::test]
async fn test_backend_timeout() {
    let server = MockRadiusServer::start(Behavior::Silent).await;
    let client = RadiusClient::new(
        server
            .client_config()
            .with_timeout(Duration::from_secs(1))
            .with_retry_interval(Duration::from_millis(300)),
    );

    let start = Instant::now();
    let err = client.authenticate("x", "y").await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, AuthError::ServiceUnavailable(_)), "got {:?}", err);
    assert!(err.is_retryable());
    assert!(elapsed >= Duration::from_millis(900), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "returned after {:?}", elapsed);
    assert_eq!(server.received().len(), 3);
}

#[tokio::test]
async fn test_cancellation() {
    let server = MockRadiusServer::start(Behavior::Silent).await;
    let client = RadiusClient::new(server.client_config().with_timeout(Duration::from_secs(10)));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = client
        .authenticate_with_cancel("alice", "wonderland", cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::ServiceUnavailable(_)), "got {:?}", err);
    assert!(start.elapsed() < Duration::from_secs(2));

    // No retries after the caller gave up
    let sent = server.received().len();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(server.received().len(), sent);
}

#[tokio::test]
async fn test_unreachable_server() {
    let port = {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    };
    let client = RadiusClient::new(
        ClientConfig::new("127.0.0.1", port, SECRET).with_timeout(Duration::from_secs(1)),
    );

    let err = client.authenticate("alice", "wonderland").await.unwrap_err();
    assert!(matches!(err, AuthError::ServiceUnavailable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unresolvable_server() {
    let client = RadiusClient::new(
        ClientConfig::new("radius.invalid", 1812, SECRET).with_timeout(Duration::from_secs(2)),
    );

    let err = client.authenticate("alice", "wonderland").await.unwrap_err();
    assert!(matches!(err, AuthError::ServiceUnavailable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_errors_do_not_leak_secrets() {
    let server = MockRadiusServer::start(Behavior::TamperedAuthenticator).await;
    let client = RadiusClient::new(server.client_config());

    let err = client.authenticate("alice", "wonderland").await.unwrap_err();
    let rendered = err.to_string();
    assert!(!rendered.contains("wonderland"));
    assert!(!rendered.contains("testing123"));
}
