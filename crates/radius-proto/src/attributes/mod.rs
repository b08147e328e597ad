//! RADIUS attribute model and wire codec

mod attribute;
mod types;

pub use attribute::Attribute;
pub use types::AttributeType;
