//! Command Handler Module
//!
//! This module implements the command processing layer for tidekv.
//! It receives decoded requests, looks them up in the command table, runs
//! them against the shared store and the connection's session, and returns
//! the reply to send.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────┐
//! │ CommandHandler  │────>│ CommandTable │
//! │                 │     └──────────────┘
//! │  - Lookup       │
//! │  - Arity check  │     ┌──────────────┐
//! │  - Execute      │────>│   Session    │
//! └────────┬────────┘     └──────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`, `ECHO`
//! - `SET`, `GET`
//! - `HELLO`

pub mod handler;
pub mod hello;
pub mod table;

pub use handler::{parse_error_reply, CommandHandler, SERVER_NAME, SERVER_VERSION};
pub use hello::{HelloError, HelloOptions};
pub use table::{Arity, CommandFn, CommandSpec, CommandTable};
