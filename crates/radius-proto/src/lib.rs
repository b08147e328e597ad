//! RADIUS Protocol Implementation
//!
//! The subset of RFC 2865 and RFC 2869 a RADIUS *client* needs to
//! authenticate a user: Access-Request construction, User-Password hiding,
//! Message-Authenticator signing and verification of Access-Accept /
//! Access-Reject / Access-Challenge replies.
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Attribute, AttributeType, Code, Packet};
//! use radius_proto::auth::{encrypt_user_password, generate_request_authenticator};
//! use radius_proto::message_auth::sign_message_authenticator;
//!
//! let req_auth = generate_request_authenticator();
//! let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);
//!
//! packet.add_attribute(
//!     Attribute::string(AttributeType::UserName as u8, "alice").unwrap()
//! );
//!
//! // The Request Authenticator must be fixed before the password is hidden
//! let encrypted_pwd = encrypt_user_password("password", b"secret", &req_auth).unwrap();
//! packet.add_attribute(
//!     Attribute::new(AttributeType::UserPassword as u8, encrypted_pwd).unwrap()
//! );
//!
//! let signed = sign_message_authenticator(&packet, b"secret").unwrap();
//! let bytes = signed.encode().unwrap();
//! assert_eq!(bytes.len(), signed.length());
//! ```

pub mod attributes;
pub mod auth;
pub mod message_auth;
pub mod packet;

pub use attributes::{Attribute, AttributeType};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator,
};
pub use message_auth::{
    calculate_message_authenticator, sign_message_authenticator, verify_message_authenticator,
    verify_packet_message_authenticator,
};
pub use packet::{Code, Packet, PacketError};
