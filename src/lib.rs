//! # tidekv - A Small RESP3 Key-Value Server
//!
//! tidekv is an in-memory key-value server that speaks a subset of the Redis
//! serialization protocol. Clients negotiate RESP3 with `HELLO` and then use
//! `PING`, `ECHO`, `SET` and `GET` against a store shared by every connection.
//!
//! ## Features
//!
//! - **Length-prefixed decoding**: Requests are arrays of bulk strings, so
//!   payloads may contain any bytes, CR and LF included
//! - **RESP3 replies**: Simple strings, errors, integers, bulk strings, null,
//!   doubles, arrays and maps
//! - **Sharded Storage**: 64 RwLock shards for concurrent access
//! - **Async I/O**: One Tokio task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              tidekv                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │──> Session       │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │    (per conn)    │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │   RESP      │    │              StorageEngine                   │   │
//! │  │   Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │  └─────────────┘    │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use tidekv::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(&Config::default()).await?;
//!     server.run(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value`
//! - `GET key`
//! - `HELLO [protover [AUTH username password] [SETNAME clientname]]`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP reply types, request type and request parser
//! - [`commands`]: Command table, dispatcher and `HELLO` handling
//! - [`session`]: Per-connection negotiation state and client ids
//! - [`storage`]: Thread-safe sharded store
//! - [`connection`]: Client connection management
//! - [`server`]: TCP listener
//! - [`config`]: Command-line and environment configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod session;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{Config, ConfigError};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{decode, ParseError, Request, RespParser, RespValue};
pub use server::Server;
pub use session::{ClientIdCounter, Session};
pub use storage::StorageEngine;

/// The default port tidekv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host tidekv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of tidekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
