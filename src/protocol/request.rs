//! Decoded client requests.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;

/// A client request: the elements of one array-of-bulk-strings message.
///
/// Element 0 is the command name. Elements are kept as raw bytes so that
/// arguments stay binary-safe; case folding of the name happens at dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    parts: Vec<Bytes>,
}

impl Request {
    pub fn new(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }

    /// Builds a request from anything convertible into `Bytes`.
    ///
    /// # Example
    /// ```
    /// use tidekv::protocol::Request;
    /// let request = Request::from_args(["SET", "name", "Ariz"]);
    /// assert_eq!(request.len(), 3);
    /// ```
    pub fn from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self {
            parts: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of elements, including the command name.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The raw command name, if the request has one.
    pub fn command_name(&self) -> Option<&Bytes> {
        self.parts.first()
    }

    /// The arguments following the command name.
    pub fn args(&self) -> &[Bytes] {
        self.parts.get(1..).unwrap_or(&[])
    }

    /// Encodes the request the way a client puts it on the wire:
    /// `*<n>\r\n($<len>\r\n<bytes>\r\n){n}`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(prefix::ARRAY);
        buf.extend_from_slice(self.parts.len().to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        for part in &self.parts {
            buf.push(prefix::BULK_STRING);
            buf.extend_from_slice(part.len().to_string().as_bytes());
            buf.extend_from_slice(CRLF);
            buf.extend_from_slice(part);
            buf.extend_from_slice(CRLF);
        }
        buf
    }
}
