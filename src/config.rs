//! Server configuration.
//!
//! Every option can be given on the command line or through the environment:
//!
//! | Flag             | Environment         | Default     |
//! |------------------|---------------------|-------------|
//! | `--host`         | `TIDEKV_HOST`       | `127.0.0.1` |
//! | `--port`         | `TIDEKV_PORT`       | `6379`      |
//! | `--max-buffer`   | `TIDEKV_MAX_BUFFER` | 1 GiB       |
//! | `--log`          | `TIDEKV_LOG`        | `info`      |
//!
//! `RUST_LOG`, when set, takes precedence over `--log`.

use crate::connection::DEFAULT_MAX_BUFFER_SIZE;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use thiserror::Error;

/// Errors found while validating a [`Config`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("max buffer size must be at least {min} bytes, got {got}")]
    BufferTooSmall { got: usize, min: usize },
}

/// Smallest accepted read buffer limit.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tidekv")]
#[command(about = "In-memory key-value server speaking RESP3")]
#[command(version)]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "TIDEKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TIDEKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Close a connection once this many undecoded bytes are buffered
    #[arg(long = "max-buffer", env = "TIDEKV_MAX_BUFFER", default_value_t = DEFAULT_MAX_BUFFER_SIZE)]
    pub max_buffer_size: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "TIDEKV_LOG", default_value = "info")]
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            log: "info".to_string(),
        }
    }
}

impl Config {
    /// Checks values that clap cannot check on its own.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.max_buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::BufferTooSmall {
                got: self.max_buffer_size,
                min: MIN_BUFFER_SIZE,
            });
        }
        Ok(self)
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
