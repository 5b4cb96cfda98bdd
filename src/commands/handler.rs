//! Command Handler Module
//!
//! This module implements the commands tidekv understands and the dispatcher
//! that routes decoded requests to them.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value` - Set a key
//! - `GET key` - Get a key's value
//! - `HELLO [protover [AUTH username password] [SETNAME clientname]]` - Handshake
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  execute()  │───>│  lookup +   │───>│  cmd_*()    │     │
//! │  │             │    │  arity      │    │             │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                          │         │        │
//! │                                          ▼         ▼        │
//! │                                StorageEngine    Session     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dispatch never fails outward: every problem becomes an error reply.

use crate::commands::hello::HelloOptions;
use crate::commands::table::{Arity, CommandSpec, CommandTable};
use crate::protocol::{decode, ParseError, Request, RespValue};
use crate::session::{ClientIdCounter, Session};
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace};

/// Server name reported by `HELLO`.
pub const SERVER_NAME: &str = "redis";

/// Server version reported by `HELLO`.
pub const SERVER_VERSION: &str = "0.0.1";

/// Handles Redis commands by dispatching them to the appropriate handlers.
///
/// Cloning is cheap; all clones share the store, the client id counter and
/// the command table.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
    /// Source of ids for successful `HELLO`s
    client_ids: Arc<ClientIdCounter>,
    /// Built once, shared by every connection
    table: Arc<CommandTable>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self::with_client_ids(storage, Arc::new(ClientIdCounter::new()))
    }

    /// Creates a command handler that allocates client ids from `client_ids`.
    pub fn with_client_ids(storage: Arc<StorageEngine>, client_ids: Arc<ClientIdCounter>) -> Self {
        Self {
            storage,
            client_ids,
            table: Arc::new(Self::builtin_commands()),
        }
    }

    fn builtin_commands() -> CommandTable {
        let mut table = CommandTable::new();
        table.register(CommandSpec::new("ping", Arity::range(0, 1), Self::cmd_ping));
        table.register(CommandSpec::new("echo", Arity::exactly(1), Self::cmd_echo));
        table.register(CommandSpec::new("set", Arity::exactly(2), Self::cmd_set));
        table.register(CommandSpec::new("get", Arity::exactly(1), Self::cmd_get));
        table.register(CommandSpec::new("hello", Arity::at_least(0), Self::cmd_hello));
        table
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    pub fn client_ids(&self) -> &Arc<ClientIdCounter> {
        &self.client_ids
    }

    /// Executes a command and returns the response.
    ///
    /// # Arguments
    ///
    /// * `session` - State of the connection the request arrived on
    /// * `request` - The decoded request
    ///
    /// # Returns
    ///
    /// The RESP response to send back to the client.
    pub fn execute(&self, session: &mut Session, request: &Request) -> RespValue {
        let Some(raw_name) = request.command_name() else {
            return RespValue::error("Protocol error: empty command");
        };

        let name = match std::str::from_utf8(raw_name) {
            Ok(s) => s.to_lowercase(),
            Err(_) => return RespValue::error("invalid command name"),
        };

        self.dispatch(&name, session, request.args())
    }

    /// Decodes one raw message, executes it and encodes the reply.
    ///
    /// Decode failures are answered with an error reply like any other error.
    pub fn process(&self, session: &mut Session, msg: &[u8]) -> Vec<u8> {
        let response = match decode(msg) {
            Ok(request) => self.execute(session, &request),
            Err(e) => parse_error_reply(&e),
        };
        response.serialize()
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, name: &str, session: &mut Session, args: &[Bytes]) -> RespValue {
        let Some(spec) = self.table.lookup(name) else {
            debug!(command = %name, "Unknown command");
            return RespValue::error(format!("unknown command '{}'", name));
        };

        if !spec.arity.accepts(args.len()) {
            return RespValue::error(format!(
                "wrong number of arguments for '{}' command",
                spec.name
            ));
        }

        trace!(command = spec.name, args = args.len(), "Dispatching command");
        (spec.handler)(self, session, args)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, _session: &mut Session, args: &[Bytes]) -> RespValue {
        match args.first() {
            Some(msg) => RespValue::bulk_string(msg.clone()),
            None => RespValue::pong(),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, _session: &mut Session, args: &[Bytes]) -> RespValue {
        RespValue::bulk_string(args[0].clone())
    }

    /// SET key value
    fn cmd_set(&self, _session: &mut Session, args: &[Bytes]) -> RespValue {
        self.storage.set(args[0].clone(), args[1].clone());
        RespValue::ok()
    }

    /// GET key
    fn cmd_get(&self, _session: &mut Session, args: &[Bytes]) -> RespValue {
        match self.storage.get(&args[0]) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::null(),
        }
    }

    /// HELLO [protover [AUTH username password] [SETNAME clientname]]
    ///
    /// Every successful call allocates a new client id, including repeated
    /// handshakes on the same connection.
    fn cmd_hello(&self, session: &mut Session, args: &[Bytes]) -> RespValue {
        let options = match HelloOptions::parse(args) {
            Ok(options) => options,
            Err(e) => return RespValue::error(e.to_string()),
        };

        let id = self.client_ids.next_id();
        let protocol = options.protocol;
        session.negotiate(protocol, id, options.auth.map(|(user, _)| user), options.name);
        debug!(client_id = id, protocol, "Client negotiated protocol");

        RespValue::map([
            ("server", RespValue::simple_string(SERVER_NAME)),
            ("version", RespValue::simple_string(SERVER_VERSION)),
            ("proto", RespValue::integer(i64::from(protocol))),
            ("id", RespValue::integer(id as i64)),
            ("mode", RespValue::simple_string("standalone")),
            ("role", RespValue::simple_string("master")),
            ("modules", RespValue::array(vec![])),
        ])
    }
}

/// The error reply sent for a message that could not be decoded.
pub fn parse_error_reply(err: &ParseError) -> RespValue {
    match err {
        ParseError::NotAnArray => RespValue::error(format!("Protocol error: {}", err)),
        _ => RespValue::error(format!("Parse error: {}", err)),
    }
}
