//! The command table.
//!
//! Each supported command is described once by a [`CommandSpec`]: its
//! lower-case name, how many arguments it takes, and the function that runs
//! it. The table is built when the [`CommandHandler`] is created and never
//! changes afterwards.

use crate::commands::handler::CommandHandler;
use crate::protocol::RespValue;
use crate::session::Session;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// Signature every command implementation has. `args` excludes the command name.
pub type CommandFn = fn(&CommandHandler, &mut Session, &[Bytes]) -> RespValue;

/// Accepted argument count, not counting the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

/// One entry of the command table.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub handler: CommandFn,
}

impl CommandSpec {
    pub fn new(name: &'static str, arity: Arity, handler: CommandFn) -> Self {
        debug_assert_eq!(name, name.to_lowercase(), "command names are stored lower-case");
        Self {
            name,
            arity,
            handler,
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Lookup from lower-case command name to its [`CommandSpec`].
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: HashMap<&'static str, CommandSpec>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command, replacing any earlier one with the same name.
    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    /// Finds a command by its lower-case name.
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
