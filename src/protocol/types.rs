//! RESP3 Reply Types
//!
//! This module defines the replies tidekv sends back to clients.
//! Every reply is one variant of [`RespValue`], and every variant has exactly
//! one wire encoding, so serialization can never fail.
//!
//! ## Protocol Format
//!
//! Each reply starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `_` Null
//! - `,` Double
//! - `*` Array
//! - `%` Map
//!
//! Scalar replies are terminated with CRLF (`\r\n`). Aggregates (arrays and
//! maps) carry a count header followed by their already-encoded elements.
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command 'foo'\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null: `_\r\n`
//! Double: `,3.25\r\n`
//! Map: `%1\r\n+proto\r\n:3\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// Every error reply carries this code in front of its message.
pub const ERROR_CODE: &str = "ERR";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const NULL: u8 = b'_';
    pub const DOUBLE: u8 = b',';
    pub const ARRAY: u8 = b'*';
    pub const MAP: u8 = b'%';
}

/// A reply in the RESP3 protocol.
///
/// Values are built by command handlers and serialized by the connection
/// handler right before they are written to the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Short, non-binary text. Must not contain CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// An error message. The `ERR` code is added during serialization.
    /// Format: `-ERR <message>\r\n`
    Error(String),

    /// 64-bit signed integers.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string; the length prefix makes embedded CR/LF harmless.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// The RESP3 null.
    /// Format: `_\r\n`
    Null,

    /// A floating point number in its shortest round-trip decimal form.
    /// Format: `,<double>\r\n`
    Double(f64),

    /// Ordered sequence of replies, possibly nested.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),

    /// Ordered key/value pairs. Keys go out as simple strings.
    /// Format: `%<count>\r\n<key1><value1>...`
    Map(Vec<(String, RespValue)>),
}

impl RespValue {
    /// Creates a new simple string response.
    ///
    /// # Example
    /// ```
    /// use tidekv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error response. The message should not include the
    /// `ERR` code; it is prepended on the wire.
    ///
    /// # Example
    /// ```
    /// use tidekv::protocol::types::RespValue;
    /// let err = RespValue::error("syntax error");
    /// assert_eq!(err.serialize(), b"-ERR syntax error\r\n");
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new integer response.
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string response.
    ///
    /// # Example
    /// ```
    /// use tidekv::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null response.
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Creates a double response.
    pub fn double(f: f64) -> Self {
        RespValue::Double(f)
    }

    /// Creates an array response.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Creates a map response. Entry order is preserved on the wire.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, RespValue)>) -> Self {
        RespValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Common response for PONG
    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the RESP value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the RESP value into an existing buffer.
    ///
    /// This is more efficient than `serialize()` when you want to reuse a buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => write_simple(buf, s),
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(ERROR_CODE.as_bytes());
                buf.push(b' ');
                write_line(buf, s);
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => {
                buf.push(prefix::NULL);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Double(f) => {
                buf.push(prefix::DOUBLE);
                buf.extend_from_slice(format_double(*f).as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                write_header(buf, prefix::ARRAY, values.len());
                for value in values {
                    value.serialize_into(buf);
                }
            }
            RespValue::Map(entries) => {
                write_header(buf, prefix::MAP, entries.len());
                for (key, value) in entries {
                    write_simple(buf, key);
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Attempts to extract the inner integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Looks up `key` in a map reply.
    pub fn get_field(&self, key: &str) -> Option<&RespValue> {
        match self {
            RespValue::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

fn write_simple(buf: &mut Vec<u8>, s: &str) {
    buf.push(prefix::SIMPLE_STRING);
    write_line(buf, s);
}

/// Writes `s` and the terminating CRLF. Simple strings and errors are single
/// lines, so any CR or LF inside `s` goes out as a space.
fn write_line(buf: &mut Vec<u8>, s: &str) {
    buf.extend(s.bytes().map(|b| match b {
        b'\r' | b'\n' => b' ',
        b => b,
    }));
    buf.extend_from_slice(CRLF);
}

fn write_header(buf: &mut Vec<u8>, prefix: u8, len: usize) {
    buf.push(prefix);
    buf.extend_from_slice(len.to_string().as_bytes());
    buf.extend_from_slice(CRLF);
}

/// Formats a double the way RESP3 expects it.
///
/// `Display` for `f64` already yields the shortest string that parses back to
/// the same value and never switches to exponent notation.
fn format_double(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f == f64::INFINITY {
        "inf".to_string()
    } else if f == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        f.to_string()
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {} {}", ERROR_CODE, s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Double(d) => write!(f, "(double) {}", format_double(*d)),
            RespValue::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
            RespValue::Map(entries) => {
                if entries.is_empty() {
                    write!(f, "(empty map)")
                } else {
                    writeln!(f)?;
                    for (i, (k, v)) in entries.iter().enumerate() {
                        writeln!(f, "{}# \"{}\" => {}", i + 1, k, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("unknown command 'foo'");
        assert_eq!(value.serialize(), b"-ERR unknown command 'foo'\r\n");
    }

    #[test]
    fn test_line_breaks_in_single_line_replies() {
        let value = RespValue::error("unknown command 'x\r\n+ok'");
        assert_eq!(value.serialize(), b"-ERR unknown command 'x  +ok'\r\n");

        let value = RespValue::simple_string("a\nb\rc");
        assert_eq!(value.serialize(), b"+a b c\r\n");

        let value = RespValue::map([("k\r\n", RespValue::integer(1))]);
        assert_eq!(value.serialize(), b"%1\r\n+k  \r\n:1\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        let value = RespValue::integer(1000);
        assert_eq!(value.serialize(), b":1000\r\n");

        let negative = RespValue::integer(-42);
        assert_eq!(negative.serialize(), b":-42\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_bulk_string_with_crlf_inside() {
        let value = RespValue::bulk_string(Bytes::from("a\r\nb"));
        assert_eq!(value.serialize(), b"$4\r\na\r\nb\r\n");
    }

    #[test]
    fn test_empty_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::new());
        assert_eq!(value.serialize(), b"$0\r\n\r\n");
    }

    #[test]
    fn test_null_serialize() {
        assert_eq!(RespValue::null().serialize(), b"_\r\n");
    }

    #[test]
    fn test_double_serialize() {
        assert_eq!(RespValue::double(3.25).serialize(), b",3.25\r\n");
        assert_eq!(RespValue::double(1.0).serialize(), b",1\r\n");
        assert_eq!(RespValue::double(-0.1).serialize(), b",-0.1\r\n");
        assert_eq!(RespValue::double(1e21).serialize(), b",1000000000000000000000\r\n");
    }

    #[test]
    fn test_double_non_finite() {
        assert_eq!(RespValue::double(f64::INFINITY).serialize(), b",inf\r\n");
        assert_eq!(RespValue::double(f64::NEG_INFINITY).serialize(), b",-inf\r\n");
        assert_eq!(RespValue::double(f64::NAN).serialize(), b",nan\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("GET")),
            RespValue::bulk_string(Bytes::from("name")),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn test_empty_array_serialize() {
        assert_eq!(RespValue::array(vec![]).serialize(), b"*0\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::array(vec![RespValue::integer(2), RespValue::integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_map_serialize_keeps_order() {
        let value = RespValue::map([
            ("server", RespValue::simple_string("redis")),
            ("proto", RespValue::integer(3)),
            ("modules", RespValue::array(vec![])),
        ]);
        assert_eq!(
            value.serialize(),
            b"%3\r\n+server\r\n+redis\r\n+proto\r\n:3\r\n+modules\r\n*0\r\n"
        );
    }

    #[test]
    fn test_get_field() {
        let value = RespValue::map([("id", RespValue::integer(7))]);
        assert_eq!(value.get_field("id"), Some(&RespValue::integer(7)));
        assert_eq!(value.get_field("proto"), None);
        assert_eq!(RespValue::ok().get_field("id"), None);
    }

    #[test]
    fn test_ok_response() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_pong_response() {
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }
}
