//! Disposal manager.
//!
//! Releases every command exactly once, last to first, on every exit path.
//! A failing (or panicking) release is converted into a cleanup error and the
//! remaining commands are still released.

use crate::pipeline::error::CommandFault;
use crate::pipeline::id::CommandId;
use crate::pipeline::lifecycle::Phase;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Something the disposal manager can release.
pub trait Release {
    fn command_id(&self) -> CommandId;

    fn is_released(&self) -> bool;

    /// Release held resources. Called at most once by the manager.
    fn release(&mut self) -> Result<(), CommandFault>;
}

/// A release that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupFault {
    pub command: CommandId,
    pub error: ErrorRecord,
}

#[derive(Debug, Default)]
pub struct DisposalManager {
    released: Vec<CommandId>,
}

impl DisposalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release every unreleased item in reverse order.
    pub fn release_all<R: Release>(&mut self, items: &mut [R]) -> Vec<CleanupFault> {
        let mut faults = Vec::new();
        for item in items.iter_mut().rev() {
            let command = item.command_id();
            // A release that panicked is not retried.
            if item.is_released() || self.released.contains(&command) {
                continue;
            }
            tracing::debug!(%command, "Releasing command");
            self.released.push(command);

            let outcome = catch_unwind(AssertUnwindSafe(|| item.release()));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(fault)) => fault.error,
                Err(panic) => ErrorRecord::new(panic_message(panic.as_ref()))
                    .with_id("ReleasePanicked"),
            };
            let error = ErrorRecord {
                category: ErrorCategory::Cleanup,
                terminating: false,
                phase: Some(Phase::Dispose),
                during_cleanup: true,
                ..error
            };
            tracing::warn!(%command, %error, "Cleanup fault");
            faults.push(CleanupFault { command, error });
        }
        faults
    }

    /// Commands released so far, in release order.
    pub fn released(&self) -> &[CommandId] {
        &self.released
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "release panicked".to_string()
    }
}
