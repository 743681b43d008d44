//! Command lifecycle state machine.
//!
//! ```text
//! Created ──► Began ──► Processing ──► Ended ──► Disposed
//!    │          │            │           │
//!    │          ├──► Stopped ◄┘           │
//!    │          └──► Error ◄──────────────┘ (also from Processing)
//!    └───────────────────────────────────────► Disposed
//! ```
//!
//! `Error` and `Stopped` lead only to `Disposed`. Every state may be disposed
//! from; disposal is the single exit.

use crate::pipeline::error::LifecycleError;
use serde::Serialize;
use std::fmt;

/// Lifecycle phase an engine call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Bind,
    Begin,
    Process,
    End,
    Stop,
    Dispose,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Bind => "Bind",
            Phase::Begin => "Begin",
            Phase::Process => "Process",
            Phase::End => "End",
            Phase::Stop => "Stop",
            Phase::Dispose => "Dispose",
        };
        f.write_str(name)
    }
}

/// Where a command instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum CommandState {
    #[default]
    Created,
    Began,
    Processing,
    Ended,
    /// Halted by a stop signal or an upstream cut before reaching `End`.
    Stopped,
    /// A fault aborted one of the command's phases.
    Error,
    Disposed,
}

impl CommandState {
    pub fn can_transition_to(self, next: CommandState) -> bool {
        use CommandState::*;
        matches!(
            (self, next),
            (Created, Began)
                | (Began, Processing)
                | (Processing, Processing)
                | (Began | Processing, Ended)
                | (Began | Processing, Stopped)
                | (Began | Processing | Ended, Error)
                | (Created | Ended | Stopped | Error, Disposed)
                // A command that faults while being halted stays faulted.
                | (Error, Error)
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: CommandState) -> Result<(), LifecycleError> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(LifecycleError {
                from: *self,
                to: next,
            })
        }
    }

    /// True while `Process`/`End` may still be called.
    pub fn is_running(self) -> bool {
        matches!(self, CommandState::Began | CommandState::Processing)
    }

    pub fn is_disposed(self) -> bool {
        self == CommandState::Disposed
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
