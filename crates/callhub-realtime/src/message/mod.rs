//! Signaling envelope, payload shapes, serialization, and validation.

pub mod builder;
pub mod payload;
pub mod serializer;
pub mod types;
pub mod validator;

pub use serializer::{DecodeError, decode_inbound, encode_outbound};
pub use types::{Frame, SignalKind, SignalMessage};
