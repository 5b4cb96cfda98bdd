//! Per-connection session state and client identifiers.
//!
//! A [`Session`] belongs to exactly one connection and starts out
//! unnegotiated, speaking protocol 2. A successful `HELLO` moves it to
//! `Negotiated` with the requested protocol and a freshly allocated client id.
//! Ids come from the process-wide [`ClientIdCounter`], which every connection
//! shares.

use std::sync::atomic::{AtomicU64, Ordering};

/// Protocol version a session speaks before any `HELLO`.
pub const DEFAULT_PROTOCOL: u8 = 2;

/// Highest (and only) protocol version `HELLO` accepts.
pub const SUPPORTED_PROTOCOL: u8 = 3;

/// Process-wide source of client ids.
///
/// Ids start at 1 and increase by one per allocation.
#[derive(Debug, Default)]
pub struct ClientIdCounter {
    last: AtomicU64,
}

impl ClientIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id.
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently allocated id, or 0 if none was handed out yet.
    pub fn last_id(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }
}

/// Where a session is in the `HELLO` handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Negotiation {
    #[default]
    Unnegotiated,
    Negotiated { protocol: u8, client_id: u64 },
}

/// State owned by one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    negotiation: Negotiation,
    name: Option<String>,
    user: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn negotiation(&self) -> Negotiation {
        self.negotiation
    }

    /// The protocol version in effect for this connection.
    pub fn protocol(&self) -> u8 {
        match self.negotiation {
            Negotiation::Unnegotiated => DEFAULT_PROTOCOL,
            Negotiation::Negotiated { protocol, .. } => protocol,
        }
    }

    /// Id assigned by the latest successful `HELLO`.
    pub fn client_id(&self) -> Option<u64> {
        match self.negotiation {
            Negotiation::Unnegotiated => None,
            Negotiation::Negotiated { client_id, .. } => Some(client_id),
        }
    }

    /// Name set through `HELLO ... SETNAME`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// User name given through `HELLO ... AUTH`.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Records a successful negotiation. Options that were not supplied
    /// leave the previous value in place.
    pub(crate) fn negotiate(
        &mut self,
        protocol: u8,
        client_id: u64,
        user: Option<String>,
        name: Option<String>,
    ) {
        self.negotiation = Negotiation::Negotiated {
            protocol,
            client_id,
        };
        if user.is_some() {
            self.user = user;
        }
        if name.is_some() {
            self.name = name;
        }
    }
}
