/// RADIUS attribute types used by the Access-Request / Access-Accept exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1) - RFC 2865
    UserName = 1,
    /// User-Password (2) - RFC 2865, hidden with the shared secret
    UserPassword = 2,
    /// Reply-Message (18) - RFC 2865
    ReplyMessage = 18,
    /// NAS-Identifier (32) - RFC 2865
    NasIdentifier = 32,
    /// Message-Authenticator (80) - RFC 2869, HMAC-MD5 over the whole packet
    MessageAuthenticator = 80,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributeType::UserName),
            2 => Some(AttributeType::UserPassword),
            18 => Some(AttributeType::ReplyMessage),
            32 => Some(AttributeType::NasIdentifier),
            80 => Some(AttributeType::MessageAuthenticator),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
