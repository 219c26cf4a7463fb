//! Command - one input token of the bulk stream
//!
//! Uses Arc<str> internally so the token can be cloned into a pending bulk
//! without reallocating.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Literal that opens a dynamic block.
pub const OPEN_MARKER: &str = "{";

/// Literal that closes a dynamic block.
pub const CLOSE_MARKER: &str = "}";

/// How the boundary detector treats a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `{`
    OpenBlock,
    /// `}`
    CloseBlock,
    /// Anything else, accumulated verbatim
    Plain,
}

/// Opaque, immutable text command.
///
/// # Examples
/// ```
/// use contracts::{Command, CommandKind};
///
/// let cmd: Command = "cmd1".into();
/// assert_eq!(cmd.kind(), CommandKind::Plain);
/// assert_eq!(Command::from("{").kind(), CommandKind::OpenBlock);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Command(Arc<str>);

impl Command {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the command against the reserved block markers.
    ///
    /// Only exact matches count: `" {"` or `"{{"` are plain commands.
    pub fn kind(&self) -> CommandKind {
        match self.as_str() {
            OPEN_MARKER => CommandKind::OpenBlock,
            CLOSE_MARKER => CommandKind::CloseBlock,
            _ => CommandKind::Plain,
        }
    }
}

impl Deref for Command {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Command {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Command {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Command {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Command {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl PartialEq<str> for Command {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Command {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({:?})", self.as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
