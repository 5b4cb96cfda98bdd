//! Argument grammar of the `HELLO` handshake.
//!
//! ```text
//! HELLO [protover [AUTH username password] [SETNAME clientname]]
//! ```
//!
//! A bare `HELLO` asks for protocol 3. When a first argument is present it
//! must be the protocol version, and only 3 is accepted.

use crate::session::SUPPORTED_PROTOCOL;
use bytes::Bytes;
use thiserror::Error;

/// Why a `HELLO` was rejected. The display text is the error reply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HelloError {
    /// Non-numeric protocol version, unknown option, or an option missing
    /// its arguments.
    #[error("syntax error")]
    Syntax,

    #[error("unsupported protover")]
    UnsupportedProtover(i64),
}

/// A successfully parsed `HELLO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloOptions {
    pub protocol: u8,
    /// `(username, password)`. Accepted as given; nothing is verified.
    pub auth: Option<(String, String)>,
    pub name: Option<String>,
}

impl HelloOptions {
    /// Parses the arguments following the `HELLO` command name.
    pub fn parse(args: &[Bytes]) -> Result<Self, HelloError> {
        let mut options = HelloOptions {
            protocol: SUPPORTED_PROTOCOL,
            auth: None,
            name: None,
        };

        let Some((protover, mut rest)) = args.split_first() else {
            return Ok(options);
        };

        let version: i64 = std::str::from_utf8(protover)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(HelloError::Syntax)?;
        if version != i64::from(SUPPORTED_PROTOCOL) {
            return Err(HelloError::UnsupportedProtover(version));
        }

        while let Some((option, tail)) = rest.split_first() {
            let option = String::from_utf8_lossy(option).to_ascii_lowercase();
            match (option.as_str(), tail) {
                ("auth", [user, pass, tail @ ..]) => {
                    options.auth = Some((lossy(user), lossy(pass)));
                    rest = tail;
                }
                ("setname", [name, tail @ ..]) => {
                    options.name = Some(lossy(name));
                    rest = tail;
                }
                _ => return Err(HelloError::Syntax),
            }
        }

        Ok(options)
    }
}

fn lossy(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
