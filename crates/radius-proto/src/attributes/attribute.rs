use super::AttributeType;
use crate::packet::PacketError;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Attribute value (0-253 bytes)
    pub value: Vec<u8>,
}

impl Attribute {
    /// Minimum attribute length (type + length fields = 2 bytes)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum attribute length (255 bytes including type and length)
    pub const MAX_LENGTH: usize = 255;
    /// Maximum value length (253 bytes)
    pub const MAX_VALUE_LENGTH: usize = 253;
    /// Message-Authenticator value length (RFC 2869 Section 5.14)
    pub const MESSAGE_AUTHENTICATOR_LENGTH: usize = 16;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::Encoding(format!(
                "attribute {} value too long: {} bytes (max {})",
                attr_type,
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Create a Message-Authenticator attribute carrying `digest`
    pub fn message_authenticator(digest: [u8; 16]) -> Self {
        Attribute {
            attr_type: AttributeType::MessageAuthenticator.as_u8(),
            value: digest.to_vec(),
        }
    }

    /// Encode attribute to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.encoded_length());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Append the wire form of this attribute to `buffer`
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        if self.value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::Encoding(format!(
                "attribute {} value too long: {} bytes (max {})",
                self.attr_type,
                self.value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }

        buffer.push(self.attr_type);
        buffer.push(self.encoded_length() as u8);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    /// Decode a single attribute starting at the front of `data`
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        Self::decode_at(data, 0).map(|(attr, _)| attr)
    }

    /// Decode the attribute at `offset`, returning it with the offset of the next one
    pub fn decode_at(data: &[u8], offset: usize) -> Result<(Self, usize), PacketError> {
        let remaining = data.len().saturating_sub(offset);
        if remaining < Self::MIN_LENGTH {
            return Err(PacketError::Decoding(format!(
                "attribute header truncated at offset {}: {} bytes left",
                offset, remaining
            )));
        }

        let attr_type = data[offset];
        let length = data[offset + 1] as usize;

        if length < Self::MIN_LENGTH {
            return Err(PacketError::Decoding(format!(
                "attribute {} declares invalid length {}",
                attr_type, length
            )));
        }

        if length > remaining {
            return Err(PacketError::Decoding(format!(
                "attribute {} declares length {} but only {} bytes remain",
                attr_type, length, remaining
            )));
        }

        let value = data[offset + Self::MIN_LENGTH..offset + length].to_vec();
        Ok((Attribute { attr_type, value }, offset + length))
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    pub fn is_type(&self, attr_type: AttributeType) -> bool {
        self.attr_type == attr_type.as_u8()
    }

    /// Try to interpret value as a string
    pub fn as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }
}
