//! Client commands, protocol phases and the literal reply tokens
//!
//! Every token here is part of the wire contract between clients, the
//! coordinator and the workers. They must match byte for byte.

use std::fmt;
use std::str::FromStr;

/// Worker acknowledgment of the PREPARE phase
pub const PREPARED: &str = "PREPARED";
pub const PUT_SUCCESS: &str = "PUT_SUCCESS";
pub const DELETE_SUCCESS: &str = "DELETE_SUCCESS";
pub const KEY_NOT_FOUND: &str = "KEY_NOT_FOUND";
pub const ROLLBACK_SUCCESS: &str = "ROLLBACK_SUCCESS";
pub const INVALID_COMMAND: &str = "Invalid Command.";

/// Returned to the client when PREPARE was not unanimous
pub const PREPARE_FAILED: &str = "Operation failed during preparation.";

pub const PUT_ARITY: &str = "PUT command requires key and value.";
pub const GET_ARITY: &str = "GET command requires key.";
pub const DELETE_ARITY: &str = "DELETE command requires key.";

/// Recognized command verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Put,
    Get,
    Delete,
}

impl Verb {
    /// Match an exact upper-case verb token. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "PUT" => Some(Verb::Put),
            "GET" => Some(Verb::Get),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    /// Number of arguments the verb takes
    pub fn arity(&self) -> usize {
        match self {
            Verb::Put => 2,
            Verb::Get | Verb::Delete => 1,
        }
    }

    /// Message returned when the argument count is wrong
    pub fn arity_error(&self) -> &'static str {
        match self {
            Verb::Put => PUT_ARITY,
            Verb::Get => GET_ARITY,
            Verb::Delete => DELETE_ARITY,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Put => write!(f, "PUT"),
            Verb::Get => write!(f, "GET"),
            Verb::Delete => write!(f, "DELETE"),
        }
    }
}

/// A client command as received from the wire.
///
/// The name is kept verbatim rather than parsed into a [`Verb`] so that an
/// unknown verb still reaches the workers and is answered with
/// [`INVALID_COMMAND`] at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new("PUT", vec![key.into(), value.into()])
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::new("GET", vec![key.into()])
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::new("DELETE", vec![key.into()])
    }

    pub fn verb(&self) -> Option<Verb> {
        Verb::parse(&self.name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Stage of the two-phase commit protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Commit,
    Rollback,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Prepare, Phase::Commit, Phase::Rollback];

    /// Worker endpoint serving this phase
    pub fn route(&self) -> &'static str {
        match self {
            Phase::Prepare => "/prepare",
            Phase::Commit => "/commit",
            Phase::Rollback => "/rollback",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prepare => write!(f, "PREPARE"),
            Phase::Commit => write!(f, "COMMIT"),
            Phase::Rollback => write!(f, "ROLLBACK"),
        }
    }
}

impl FromStr for Phase {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PREPARE" => Ok(Phase::Prepare),
            "COMMIT" => Ok(Phase::Commit),
            "ROLLBACK" => Ok(Phase::Rollback),
            _ => Err(crate::Error::Other(format!("unknown phase: {}", s))),
        }
    }
}
