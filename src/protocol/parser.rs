//! RESP Request Parser
//!
//! Clients send every command as an array of bulk strings:
//!
//! ```text
//! *<n>\r\n
//! $<len>\r\n<bytes>\r\n     (repeated n times)
//! ```
//!
//! The parser never scans element payloads for delimiters. It reads the
//! declared length and then takes exactly that many bytes, which is what makes
//! values containing CR or LF safe to transport.
//!
//! ## How the Parser Works
//!
//! [`RespParser::parse`] works on a growing read buffer and returns either:
//! - `Ok(Some((request, consumed)))` - a full request was decoded from the front
//!   of the buffer, `consumed` bytes were used
//! - `Ok(None)` - the buffer only holds the beginning of a request
//! - `Err(ParseError)` - the bytes can never become a valid request
//!
//! [`decode`] is the one-shot form: it treats the input as one complete
//! message, so running out of bytes is reported as an error too.

use crate::protocol::request::Request;
use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;
use std::ops::Range;
use thiserror::Error;

/// Errors that can occur while decoding a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The message does not start with the array marker. Inline commands are
    /// not supported.
    #[error("unsupported request (expect RESP3 array)")]
    NotAnArray,

    #[error("malformed array: missing CRLF after length")]
    MissingArrayCrlf,

    #[error("invalid array length: {0}")]
    InvalidArrayLength(String),

    #[error("unexpected end of message while reading element {0}")]
    UnexpectedEnd(usize),

    #[error("expected bulk string for element {0}")]
    ExpectedBulkString(usize),

    #[error("malformed bulk string: missing CRLF after length (element {0})")]
    MissingBulkCrlf(usize),

    #[error("invalid bulk string length '{length}' (element {element})")]
    InvalidBulkLength { element: usize, length: String },

    #[error("null bulk string not allowed in command array (element {0})")]
    NullBulkString(usize),

    #[error("bulk string overruns buffer (element {0})")]
    BulkOverrun(usize),

    #[error("bulk string missing trailing CRLF (element {0})")]
    MissingTrailingCrlf(usize),

    /// The declared length exceeds the configured maximum
    #[error("bulk string too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

impl ParseError {
    /// Returns true when more bytes could still turn the input into a valid
    /// request.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            ParseError::MissingArrayCrlf
                | ParseError::UnexpectedEnd(_)
                | ParseError::MissingBulkCrlf(_)
                | ParseError::BulkOverrun(_)
        )
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Upper bound on the element vector allocated up front; a hostile array
/// header must not reserve memory for elements that never arrive.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Parser for array-of-bulk-strings requests.
///
/// # Example
///
/// ```
/// use tidekv::protocol::RespParser;
///
/// let parser = RespParser::new();
/// let buffer = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (request, consumed) = parser.parse(buffer).unwrap().unwrap();
/// assert_eq!(request.len(), 2);
/// assert_eq!(consumed, buffer.len());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RespParser {
    max_bulk_size: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self {
            max_bulk_size: MAX_BULK_SIZE,
        }
    }

    /// Creates a parser that rejects bulk strings longer than `max` bytes.
    pub fn with_max_bulk_size(max: usize) -> Self {
        Self { max_bulk_size: max }
    }

    /// Attempts to parse one request from the front of the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((request, consumed)))` - Successfully parsed a request
    /// - `Ok(None)` - Incomplete data, need more bytes
    /// - `Err(e)` - Parse error
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        match self.parse_request(buf) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) if e.is_incomplete() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parses `*<count>\r\n` followed by `count` bulk strings.
    fn parse_request(&self, buf: &[u8]) -> ParseResult<(Request, usize)> {
        if buf.first() != Some(&prefix::ARRAY) {
            return Err(ParseError::NotAnArray);
        }

        let count_end = match find_crlf(&buf[1..]) {
            Some(pos) => 1 + pos,
            None if is_partial_length(&buf[1..]) => return Err(ParseError::MissingArrayCrlf),
            None => return Err(ParseError::InvalidArrayLength(lossy(&buf[1..]))),
        };

        let count_str = lossy(&buf[1..count_end]);
        let count: usize = count_str
            .parse()
            .map_err(|_| ParseError::InvalidArrayLength(count_str.clone()))?;

        // Payloads are copied only once every element has arrived.
        let mut spans = Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS));
        let mut pos = count_end + CRLF.len();

        for element in 0..count {
            let (span, next) = self.parse_bulk_string(buf, pos, element)?;
            spans.push(span);
            pos = next;
        }

        let parts = spans
            .into_iter()
            .map(|span| Bytes::copy_from_slice(&buf[span]))
            .collect();

        Ok((Request::new(parts), pos))
    }

    /// Parses a bulk string starting at `pos`: `$<length>\r\n<data>\r\n`.
    ///
    /// Returns where the payload sits in `buf` and the position right after
    /// its trailing CRLF.
    fn parse_bulk_string(
        &self,
        buf: &[u8],
        pos: usize,
        element: usize,
    ) -> ParseResult<(Range<usize>, usize)> {
        if pos >= buf.len() {
            return Err(ParseError::UnexpectedEnd(element));
        }
        if buf[pos] != prefix::BULK_STRING {
            return Err(ParseError::ExpectedBulkString(element));
        }

        let header_start = pos + 1;
        let header_end = match find_crlf(&buf[header_start..]) {
            Some(rel) => header_start + rel,
            None if is_partial_length(&buf[header_start..]) => {
                return Err(ParseError::MissingBulkCrlf(element))
            }
            None => {
                return Err(ParseError::InvalidBulkLength {
                    element,
                    length: lossy(&buf[header_start..]),
                })
            }
        };

        let length_str = lossy(&buf[header_start..header_end]);
        let length: i64 = length_str
            .parse()
            .map_err(|_| ParseError::InvalidBulkLength {
                element,
                length: length_str.clone(),
            })?;

        if length < 0 {
            return Err(ParseError::NullBulkString(element));
        }

        let length = match usize::try_from(length) {
            Ok(length) if length <= self.max_bulk_size => length,
            _ => {
                return Err(ParseError::TooLarge {
                    size: usize::try_from(length).unwrap_or(usize::MAX),
                    max: self.max_bulk_size,
                })
            }
        };

        let data_start = header_end + CRLF.len();
        let data_end = data_start + length;
        if data_end + CRLF.len() > buf.len() {
            return Err(ParseError::BulkOverrun(element));
        }

        if &buf[data_end..data_end + CRLF.len()] != CRLF {
            return Err(ParseError::MissingTrailingCrlf(element));
        }

        Ok((data_start..data_end, data_end + CRLF.len()))
    }
}

/// Decodes one complete request message.
///
/// Trailing NUL bytes (left over from fixed-size client buffers) are dropped
/// first. Unlike [`RespParser::parse`], a message that ends early is an error.
///
/// # Example
///
/// ```
/// use tidekv::protocol::{decode, ParseError};
///
/// let request = decode(b"*1\r\n$4\r\nPING\r\n\0\0\0").unwrap();
/// assert_eq!(request.len(), 1);
///
/// assert_eq!(decode(b"PING\r\n"), Err(ParseError::NotAnArray));
/// ```
pub fn decode(msg: &[u8]) -> ParseResult<Request> {
    let end = msg.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    RespParser::new()
        .parse_request(&msg[..end])
        .map(|(request, _)| request)
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == CRLF)
}

/// Whether `header` could still be the beginning of `<integer>\r\n`.
fn is_partial_length(header: &[u8]) -> bool {
    let digits = header.strip_suffix(b"\r").unwrap_or(header);
    let digits = digits
        .strip_prefix(b"-")
        .or_else(|| digits.strip_prefix(b"+"))
        .unwrap_or(digits);
    digits.iter().all(u8::is_ascii_digit)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Helper function to parse a single request from bytes.
///
/// This is a convenience function for simple use cases.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
    RespParser::new().parse(buf)
}
