//! Translation between the canonical model and each backend's wire format.
//!
//! Requests render through the field tables into a [`WireRequest`]; responses
//! parse back the same way. All translation functions are pure (no I/O); the
//! stream decoder only pulls from the byte stream it is handed.
//!
//! [`WireRequest`]: crate::transport::WireRequest

pub mod mapper;
pub mod path;
pub mod request;
pub mod response;
pub mod streaming;
pub mod tables;

pub use request::{CountTokensParameters, GenerateContentParameters};
pub use streaming::EventStream;
