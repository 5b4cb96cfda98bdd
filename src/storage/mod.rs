//! Storage Engine Module
//!
//! This module provides the shared store of tidekv: a thread-safe, sharded
//! key-value map that every connection reads and writes.
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Last writer wins**: `SET` always overwrites
//!
//! ## Example
//!
//! ```
//! use tidekv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set(Bytes::from("name"), Bytes::from("Ariz"));
//! assert_eq!(engine.get(b"name"), Some(Bytes::from("Ariz")));
//! ```

pub mod engine;

pub use engine::{StorageEngine, StorageStats};
