//! Message-Authenticator Support (RFC 2869)
//!
//! Message-Authenticator is an HMAC-MD5 over the entire RADIUS packet, keyed
//! with the shared secret, computed while its own 16-byte value is all zeros.
//!
//! Signing never patches serialized bytes. The attribute list is encoded once
//! with a zeroed placeholder to produce the digest, then the list is rebuilt
//! with the digest in place and encoded again by the caller.

use crate::attributes::{Attribute, AttributeType};
use crate::packet::{Packet, PacketError};
use hmac::{Hmac, Mac};
use md5_digest::Md5;

type HmacMd5 = Hmac<Md5>;

const ZEROED: [u8; 16] = [0u8; 16];

/// Calculate HMAC-MD5(secret, packet_bytes)
pub fn calculate_message_authenticator(packet_bytes: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut mac = new_mac(secret);
    mac.update(packet_bytes);
    let mut output = [0u8; 16];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// Return `packet` with a valid Message-Authenticator
///
/// A zeroed Message-Authenticator is appended when the packet has none; an
/// existing one keeps its position. Only that attribute's value differs
/// between the input and the result.
pub fn sign_message_authenticator(packet: &Packet, secret: &[u8]) -> Result<Packet, PacketError> {
    let mut placeholder = with_zeroed_message_authenticator(packet);
    if placeholder
        .find_attribute(AttributeType::MessageAuthenticator.as_u8())
        .is_none()
    {
        placeholder.add_attribute(Attribute::message_authenticator(ZEROED));
    }

    let digest = calculate_message_authenticator(&placeholder.encode()?, secret);

    let attributes = placeholder
        .attributes
        .into_iter()
        .map(|attr| {
            if attr.is_type(AttributeType::MessageAuthenticator) {
                Attribute::message_authenticator(digest)
            } else {
                attr
            }
        })
        .collect();

    Ok(Packet {
        attributes,
        ..placeholder
    })
}

/// Verify the Message-Authenticator of a reply (RFC 3579 Section 3.2)
///
/// The digest of a reply is computed with the Request Authenticator in the
/// header in place of the Response Authenticator. Returns `None` when the
/// packet carries no Message-Authenticator.
pub fn verify_packet_message_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Option<bool> {
    let received = packet.find_attribute(AttributeType::MessageAuthenticator.as_u8())?;

    let mut zeroed = with_zeroed_message_authenticator(packet);
    zeroed.authenticator = *request_authenticator;

    let Ok(bytes) = zeroed.encode() else {
        return Some(false);
    };

    let mut mac = new_mac(secret);
    mac.update(&bytes);
    Some(mac.verify_slice(&received.value).is_ok())
}

/// Verify a Message-Authenticator found at `message_auth_offset` in raw request bytes
pub fn verify_message_authenticator(
    packet_bytes: &[u8],
    secret: &[u8],
    message_auth_offset: usize,
) -> bool {
    if message_auth_offset + 16 > packet_bytes.len() {
        return false;
    }

    let received_auth = &packet_bytes[message_auth_offset..message_auth_offset + 16];

    let mut packet_copy = packet_bytes.to_vec();
    packet_copy[message_auth_offset..message_auth_offset + 16].fill(0);

    let mut mac = new_mac(secret);
    mac.update(&packet_copy);
    mac.verify_slice(received_auth).is_ok()
}

fn with_zeroed_message_authenticator(packet: &Packet) -> Packet {
    let mut copy = packet.clone();
    for attr in copy
        .attributes
        .iter_mut()
        .filter(|a| a.is_type(AttributeType::MessageAuthenticator))
    {
        attr.value = ZEROED.to_vec();
    }
    copy
}

fn new_mac(secret: &[u8]) -> HmacMd5 {
    HmacMd5::new_from_slice(secret).expect("HMAC can take key of any size")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::calculate_response_authenticator;
    use crate::packet::Code;

    fn request() -> Packet {
        let mut packet = Packet::new(Code::AccessRequest, 9, [3u8; 16]);
        packet.add_attribute(Attribute::string(AttributeType::UserName as u8, "alice").unwrap());
        packet.add_attribute(
            Attribute::string(AttributeType::NasIdentifier as u8, "auth-backend").unwrap(),
        );
        packet
    }

    #[test]
    fn test_calculate_message_authenticator() {
        let packet = vec![0u8; 20];
        let secret = b"testing123";

        let auth = calculate_message_authenticator(&packet, secret);
        assert_eq!(auth, calculate_message_authenticator(&packet, secret));
        assert_ne!(auth, calculate_message_authenticator(&packet, b"other"));
    }

    #[test]
    fn test_sign_appends_last_attribute() {
        let signed = sign_message_authenticator(&request(), b"testing123").unwrap();

        assert_eq!(signed.attributes.len(), 3);
        let last = signed.attributes.last().unwrap();
        assert!(last.is_type(AttributeType::MessageAuthenticator));
        assert_ne!(last.value, ZEROED.to_vec());
        assert_eq!(signed.attributes[..2], request().attributes[..]);
    }

    #[test]
    fn test_signed_bytes_verify_at_offset() {
        let secret = b"testing123";
        let signed = sign_message_authenticator(&request(), secret).unwrap();
        let bytes = signed.encode().unwrap();

        let offset = bytes.len() - 16;
        assert!(verify_message_authenticator(&bytes, secret, offset));
        assert!(!verify_message_authenticator(&bytes, b"wrong", offset));
    }

    #[test]
    fn test_sign_is_idempotent() {
        let secret = b"testing123";
        let once = sign_message_authenticator(&request(), secret).unwrap();
        let twice = sign_message_authenticator(&once, secret).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_verify_reply_message_authenticator() {
        let secret = b"testing123";
        let request_auth = [5u8; 16];

        let mut reply = Packet::new(Code::AccessAccept, 9, request_auth);
        reply.add_attribute(Attribute::message_authenticator(ZEROED));
        let mut reply = sign_message_authenticator(&reply, secret).unwrap();
        reply.authenticator =
            calculate_response_authenticator(&reply, &request_auth, secret).unwrap();

        assert_eq!(
            verify_packet_message_authenticator(&reply, &request_auth, secret),
            Some(true)
        );
        assert_eq!(
            verify_packet_message_authenticator(&reply, &[6u8; 16], secret),
            Some(false)
        );
    }

    #[test]
    fn test_verify_reply_without_message_authenticator() {
        let reply = Packet::new(Code::AccessReject, 1, [0u8; 16]);
        assert_eq!(
            verify_packet_message_authenticator(&reply, &[0u8; 16], b"s"),
            None
        );
    }

    #[test]
    fn test_verify_message_authenticator_out_of_bounds() {
        assert!(!verify_message_authenticator(&[0u8; 20], b"testing123", 100));
    }
}
