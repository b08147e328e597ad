use crate::packet::{Packet, PacketError};
use rand::Rng;

/// Maximum User-Password plaintext length (RFC 2865 Section 5.2)
pub const MAX_PASSWORD_LENGTH: usize = 128;

const BLOCK_SIZE: usize = 16;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let encoded = packet.encode()?;

    let mut ctx = md5::Context::new();
    ctx.consume(&encoded[..4]);
    ctx.consume(request_authenticator);
    ctx.consume(&encoded[Packet::MIN_PACKET_SIZE..]);
    ctx.consume(secret);
    Ok(ctx.compute().0)
}

/// Verify the Response Authenticator of a reply against the request it answers
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    match calculate_response_authenticator(response, request_authenticator, secret) {
        Ok(calculated) => response.authenticator == calculated,
        Err(_) => false,
    }
}

/// Hide a User-Password per RFC 2865 Section 5.2
///
/// The password is zero-padded to a multiple of 16 bytes, then each block is
/// XORed with MD5(secret + previous), where previous is the Request
/// Authenticator for the first block and the preceding ciphertext block after.
pub fn encrypt_user_password(
    password: &str,
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    let password_bytes = password.as_bytes();
    if password_bytes.len() > MAX_PASSWORD_LENGTH {
        return Err(PacketError::Encoding(format!(
            "password longer than {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }

    let blocks = password_bytes.len().div_ceil(BLOCK_SIZE).max(1);
    let mut padded = password_bytes.to_vec();
    padded.resize(blocks * BLOCK_SIZE, 0);

    let mut result = Vec::with_capacity(padded.len());
    let mut previous: [u8; 16] = *authenticator;

    for chunk in padded.chunks(BLOCK_SIZE) {
        let hash = block_key(secret, &previous);
        for (i, byte) in chunk.iter().enumerate() {
            previous[i] = byte ^ hash[i];
        }
        result.extend_from_slice(&previous);
    }

    Ok(result)
}

/// Recover a User-Password hidden with [`encrypt_user_password`]
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<String, PacketError> {
    if encrypted.is_empty() || encrypted.len() % BLOCK_SIZE != 0 {
        return Err(PacketError::Decoding(format!(
            "hidden password length {} is not a non-zero multiple of 16",
            encrypted.len()
        )));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous: &[u8] = authenticator;

    for chunk in encrypted.chunks(BLOCK_SIZE) {
        let hash = block_key(secret, previous);
        result.extend(chunk.iter().zip(hash.iter()).map(|(c, h)| c ^ h));
        previous = chunk;
    }

    while result.last() == Some(&0) {
        result.pop();
    }

    String::from_utf8(result)
        .map_err(|_| PacketError::Decoding("hidden password is not valid UTF-8".to_string()))
}

fn block_key(secret: &[u8], salt: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(secret);
    ctx.consume(salt);
    ctx.compute().0
}
