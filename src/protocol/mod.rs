//! RESP Protocol Implementation
//!
//! This module is the wire codec of tidekv: pure functions between raw bytes
//! and protocol values, with no I/O and no shared state.
//!
//! ## Modules
//!
//! - `request`: The decoded `Request` (array of bulk strings)
//! - `parser`: Request decoding, streaming and one-shot
//! - `types`: The `RespValue` reply type and its encoders
//!
//! ## Example
//!
//! ```
//! use tidekv::protocol::{decode, RespValue};
//! use bytes::Bytes;
//!
//! // Decoding incoming data
//! let request = decode(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n").unwrap();
//! assert_eq!(request.args(), &[Bytes::from("name")]);
//!
//! // Creating responses
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod request;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{decode, parse_message, ParseError, ParseResult, RespParser};
pub use request::Request;
pub use types::RespValue;
