//! Structured records: the envelope for everything a command emits.
//!
//! A record carries either a result object or an out-of-band signal (error,
//! warning, verbose, debug, information, progress). Records are immutable once
//! emitted. Each kind is its own channel with a strictly increasing sequence
//! number, assigned by [`RecordSequencer::emit`].

use crate::pipeline::id::CommandId;
use crate::pipeline::lifecycle::Phase;
use crate::types::Value;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Channel a record travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    Object,
    Error,
    Warning,
    Verbose,
    Debug,
    Information,
    Progress,
}

impl RecordKind {
    pub const ALL: [RecordKind; 7] = [
        RecordKind::Object,
        RecordKind::Error,
        RecordKind::Warning,
        RecordKind::Verbose,
        RecordKind::Debug,
        RecordKind::Information,
        RecordKind::Progress,
    ];

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }

    /// Everything except `Object` bypasses downstream commands.
    pub fn is_out_of_band(self) -> bool {
        self != RecordKind::Object
    }
}

/// Broad classification of an error, for hosts that group or filter them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum ErrorCategory {
    #[default]
    NotSpecified,
    InvalidArgument,
    InvalidData,
    InvalidOperation,
    InvalidType,
    ObjectNotFound,
    OperationStopped,
    ParserError,
    ResourceUnavailable,
    /// Raised by the parameter binder.
    Binding,
    /// Raised while releasing a command's resources.
    Cleanup,
}

/// Error payload. Commands build the descriptive part; the engine fills in
/// where and how the error surfaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub category: ErrorCategory,
    /// Stable identifier, e.g. `"NoParameterAcceptsInput"`.
    pub error_id: String,
    /// The object being processed when the error occurred.
    pub target: Option<Value>,
    /// Whether the error ended the emitting command (and the chain).
    pub terminating: bool,
    /// Lifecycle phase the error surfaced in, when raised by the engine.
    pub phase: Option<Phase>,
    pub during_cleanup: bool,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: ErrorCategory::NotSpecified,
            error_id: String::new(),
            target: None,
            terminating: false,
            phase: None,
            during_cleanup: false,
        }
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_id(mut self, error_id: impl Into<String>) -> Self {
        self.error_id = error_id.into();
        self
    }

    pub fn with_target(mut self, target: Value) -> Self {
        self.target = Some(target);
        self
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.during_cleanup {
            write!(f, "during cleanup: {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Structured informational message (`Write-Information`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InformationRecord {
    pub message_data: Value,
    pub tags: Vec<String>,
    pub time_generated: DateTime<Utc>,
}

impl InformationRecord {
    pub fn new(message_data: impl Into<Value>) -> Self {
        Self {
            message_data: message_data.into(),
            tags: Vec::new(),
            time_generated: Utc::now(),
        }
    }

    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Progress of a long-running activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRecord {
    pub activity_id: i32,
    pub activity: String,
    pub status: String,
    pub percent_complete: Option<u8>,
    pub completed: bool,
}

impl ProgressRecord {
    pub fn new(activity_id: i32, activity: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            activity_id,
            activity: activity.into(),
            status: status.into(),
            percent_complete: None,
            completed: false,
        }
    }

    pub fn with_percent(mut self, percent: u8) -> Self {
        self.percent_complete = Some(percent.min(100));
        self
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self.percent_complete = Some(100);
        self
    }
}

/// Record body. The variant determines the record's channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum RecordPayload {
    Object(Value),
    Error(ErrorRecord),
    Warning(String),
    Verbose(String),
    Debug(String),
    Information(InformationRecord),
    Progress(ProgressRecord),
}

impl RecordPayload {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordPayload::Object(_) => RecordKind::Object,
            RecordPayload::Error(_) => RecordKind::Error,
            RecordPayload::Warning(_) => RecordKind::Warning,
            RecordPayload::Verbose(_) => RecordKind::Verbose,
            RecordPayload::Debug(_) => RecordKind::Debug,
            RecordPayload::Information(_) => RecordKind::Information,
            RecordPayload::Progress(_) => RecordKind::Progress,
        }
    }
}

/// Identity of the emitting command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSource {
    pub id: CommandId,
    pub name: String,
}

impl RecordSource {
    pub fn new(id: CommandId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn host() -> Self {
        Self::new(CommandId::HOST, "Host")
    }
}

/// An emitted record. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    payload: RecordPayload,
    source: RecordSource,
    sequence: u64,
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &RecordPayload {
        &self.payload
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }

    /// Position within this record's channel.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn as_object(&self) -> Option<&Value> {
        match &self.payload {
            RecordPayload::Object(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorRecord> {
        match &self.payload {
            RecordPayload::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Text of warning, verbose and debug records.
    pub fn as_message(&self) -> Option<&str> {
        match &self.payload {
            RecordPayload::Warning(m) | RecordPayload::Verbose(m) | RecordPayload::Debug(m) => {
                Some(m)
            }
            _ => None,
        }
    }

    pub fn into_payload(self) -> RecordPayload {
        self.payload
    }

    pub fn into_object(self) -> Option<Value> {
        match self.payload {
            RecordPayload::Object(value) => Some(value),
            _ => None,
        }
    }
}

/// Assigns per-channel sequence numbers. One sequencer serves a whole chain.
#[derive(Debug, Clone, Default)]
pub struct RecordSequencer {
    next: [u64; RecordKind::ALL.len()],
}

impl RecordSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record on the payload's channel. Never fails; back-pressure
    /// is the pipe's concern.
    pub fn emit(&mut self, payload: RecordPayload, source: RecordSource) -> Record {
        let slot = payload.kind().slot();
        let sequence = self.next[slot];
        self.next[slot] += 1;
        Record {
            payload,
            source,
            sequence,
        }
    }

    /// Number of records emitted so far on `kind`'s channel.
    pub fn emitted(&self, kind: RecordKind) -> u64 {
        self.next[kind.slot()]
    }
}
