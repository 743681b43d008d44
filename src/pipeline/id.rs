//! Identity types for the pipeline engine.
//!
//! IDs are newtypes over `u32` that double as indices into the chain's
//! command vector, so the position of a command is also its identity.

use serde::Serialize;
use std::fmt;

/// Position of a command within its chain (0 = head).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct CommandId(pub u32);

impl CommandId {
    /// Identity used for records the host or engine emits on its own behalf.
    pub const HOST: CommandId = CommandId(u32::MAX);

    #[inline]
    pub fn is_host(self) -> bool {
        self == Self::HOST
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "CommandId(HOST)")
        } else {
            write!(f, "CommandId({})", self.0)
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_id() {
        let id = CommandId(3);
        assert!(!id.is_host());
        assert_eq!(id.index(), 3);
        assert!(CommandId::HOST.is_host());
        assert_eq!(format!("{}", CommandId::HOST), "CommandId(HOST)");
    }

    #[test]
    fn test_ordering_follows_position() {
        assert!(CommandId(0) < CommandId(1));
    }
}
