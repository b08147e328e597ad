//! In-process mock RADIUS server for integration tests

#![allow(dead_code)]

use radius_auth::ClientConfig;
use radius_proto::auth::{calculate_response_authenticator, decrypt_user_password};
use radius_proto::message_auth::sign_message_authenticator;
use radius_proto::{Attribute, AttributeType, Code, Packet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const SECRET: &[u8] = b"testing123";

/// How the mock answers each Access-Request
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Accept alice/wonderland, reject everything else
    Verify,
    /// Answer every request with an Access-Challenge
    Challenge,
    /// Valid Access-Accept with one Response Authenticator byte flipped
    TamperedAuthenticator,
    /// Access-Accept whose Message-Authenticator does not verify
    BadMessageAuthenticator,
    /// A correctly signed reply with the wrong identifier, then [`Behavior::Verify`]
    MismatchedIdFirst,
    /// `n` garbage datagrams with the wrong identifier, nothing else
    Junk(usize),
    /// Never answer
    Silent,
    /// Drop the first `n` requests, then [`Behavior::Verify`]
    IgnoreFirst(usize),
}

pub struct MockRadiusServer {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    handle: JoinHandle<()>,
}

impl MockRadiusServer {
    pub async fn start(behavior: Behavior) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = socket.local_addr().expect("Failed to get local address");
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let count = {
                    let mut log = log.lock().unwrap();
                    log.push(buf[..len].to_vec());
                    log.len()
                };

                let request = Packet::decode(&buf[..len]).expect("client sent an invalid packet");
                for datagram in respond(behavior, &request, count) {
                    socket.send_to(&datagram, peer).await.expect("Failed to reply");
                }
            }
        });

        Self {
            addr,
            received,
            handle,
        }
    }

    /// Datagrams received so far
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }

    /// Client settings pointing at this server with short test timings
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1", self.addr.port(), SECRET)
            .with_timeout(Duration::from_secs(2))
            .with_retry_interval(Duration::from_millis(200))
    }
}

impl Drop for MockRadiusServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn respond(behavior: Behavior, request: &Packet, count: usize) -> Vec<Vec<u8>> {
    match behavior {
        Behavior::Verify => vec![verdict(request)],
        Behavior::Challenge => vec![reply(request, Code::AccessChallenge, request.identifier)],
        Behavior::TamperedAuthenticator => {
            let mut datagram = reply(request, Code::AccessAccept, request.identifier);
            datagram[4] ^= 0xff;
            vec![datagram]
        }
        Behavior::BadMessageAuthenticator => {
            let mut packet = Packet::new(Code::AccessAccept, request.identifier, [0u8; 16]);
            packet.add_attribute(Attribute::message_authenticator([0xaa; 16]));
            packet.authenticator =
                calculate_response_authenticator(&packet, &request.authenticator, SECRET).unwrap();
            vec![packet.encode().unwrap()]
        }
        Behavior::MismatchedIdFirst => vec![
            reply(request, Code::AccessReject, request.identifier.wrapping_add(1)),
            verdict(request),
        ],
        Behavior::Junk(n) => {
            let mut junk = vec![0xde; 24];
            junk[1] = request.identifier.wrapping_add(1);
            vec![junk; n]
        }
        Behavior::Silent => Vec::new(),
        Behavior::IgnoreFirst(n) if count <= n => Vec::new(),
        Behavior::IgnoreFirst(_) => vec![verdict(request)],
    }
}

fn verdict(request: &Packet) -> Vec<u8> {
    let username = request
        .find_attribute(AttributeType::UserName as u8)
        .and_then(|attr| attr.as_string().ok())
        .unwrap_or_default();
    let password = request
        .find_attribute(AttributeType::UserPassword as u8)
        .and_then(|attr| decrypt_user_password(&attr.value, SECRET, &request.authenticator).ok())
        .unwrap_or_default();

    let code = if username == "alice" && password == "wonderland" {
        Code::AccessAccept
    } else {
        Code::AccessReject
    };
    reply(request, code, request.identifier)
}

/// Signed reply with a Reply-Message and a Message-Authenticator
fn reply(request: &Packet, code: Code, identifier: u8) -> Vec<u8> {
    let mut packet = Packet::new(code, identifier, request.authenticator);
    packet.add_attribute(
        Attribute::string(AttributeType::ReplyMessage as u8, "mock says hello").unwrap(),
    );

    let mut packet = sign_message_authenticator(&packet, SECRET).unwrap();
    packet.authenticator =
        calculate_response_authenticator(&packet, &request.authenticator, SECRET).unwrap();
    packet.encode().unwrap()
}
