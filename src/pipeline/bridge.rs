//! Thread boundary between a running chain and its host.
//!
//! A chain normally runs on the caller's thread. [`PipelineJob`] runs one on
//! a dedicated thread instead; the host watches its records arrive over a
//! crossbeam channel and can stop it at any time.

use crate::error::{EngineError, Result};
use crate::pipeline::coordinator::{PipelineBuilder, PipelineOutcome, PipelineStatus};
use crate::pipeline::record::{ErrorRecord, Record};
use crate::pipeline::stop::StopToken;
use crate::types::Value;
use crossbeam_channel::{unbounded, Receiver};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Messages sent from a chain to the host as it runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message")]
pub enum HostMessage {
    /// A record reached the host timeline.
    Record(Record),

    /// The chain has finished; no further messages follow.
    Completed {
        status: PipelineStatus,
        terminal_fault: Option<ErrorRecord>,
    },
}

static NEXT_JOB: AtomicU32 = AtomicU32::new(1);

/// A chain running on its own thread.
pub struct PipelineJob {
    id: u32,
    stop: StopToken,
    messages: Receiver<HostMessage>,
    handle: JoinHandle<PipelineOutcome>,
}

impl PipelineJob {
    /// Build the chain from `builder` and run it on a new thread, feeding
    /// `input` to the head when given.
    ///
    /// The message channel is unbounded so a host that only calls
    /// [`join`](Self::join) never blocks the chain.
    pub fn spawn(builder: PipelineBuilder, input: Option<Vec<Value>>) -> Result<Self> {
        let id = NEXT_JOB.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded();
        let pipeline = builder.live(tx).build();
        let stop = pipeline.stop_token();

        let handle = std::thread::Builder::new()
            .name(format!("cmdpipe-job-{}", id))
            .spawn(move || {
                tracing::info!(job = id, "Job thread started");
                let outcome = match input {
                    Some(values) => pipeline.invoke_with_input(values),
                    None => pipeline.invoke(),
                };
                tracing::info!(job = id, status = %outcome.status, "Job thread exiting");
                outcome
            })
            .map_err(|e| EngineError::Job(format!("Failed to spawn job thread: {}", e)))?;

        Ok(Self {
            id,
            stop,
            messages: rx,
            handle,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Ask the chain to stop. It finishes its current step and tears down.
    pub fn stop(&self) {
        tracing::debug!(job = self.id, "Stop requested");
        self.stop.signal();
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Live messages, ending with [`HostMessage::Completed`].
    pub fn messages(&self) -> &Receiver<HostMessage> {
        &self.messages
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<HostMessage> {
        self.messages.try_iter().collect()
    }

    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<HostMessage> {
        self.messages.recv_timeout(timeout).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the chain to complete.
    pub fn join(self) -> Result<PipelineOutcome> {
        let id = self.id;
        self.handle
            .join()
            .map_err(|_| EngineError::Job(format!("Job {} panicked", id)))
    }
}

impl std::fmt::Debug for PipelineJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineJob")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish()
    }
}
