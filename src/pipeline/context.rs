//! Runtime surface handed to a command during each lifecycle call.
//!
//! `write_object` hands the object to the next stage synchronously: the call
//! returns only after every downstream stage has finished with it. Out-of-band
//! writes go straight to the host, filtered by the command's preferences.

use crate::adapter::PropertyAdapter;
use crate::config::{ActionPreference, PreferenceSettings};
use crate::pipeline::coordinator::{deliver, ChainState, Stage};
use crate::pipeline::error::{CommandError, CommandResult};
use crate::pipeline::id::CommandId;
use crate::pipeline::lifecycle::Phase;
use crate::pipeline::parameter::BoundParameters;
use crate::pipeline::record::{
    ErrorCategory, ErrorRecord, InformationRecord, ProgressRecord, RecordPayload,
    RecordSource,
};
use crate::scripting::ScriptEngine;
use crate::types::Value;

/// Context passed to `begin`, `process` and `end`.
pub struct CommandContext<'a> {
    pub(crate) id: CommandId,
    pub(crate) index: usize,
    pub(crate) name: &'a str,
    pub(crate) phase: Phase,
    pub(crate) parameters: &'a BoundParameters,
    pub(crate) input: Option<&'a Value>,
    pub(crate) preferences: PreferenceSettings,
    /// Stages after this one, nearest first.
    pub(crate) downstream: &'a mut [Stage],
    pub(crate) chain: &'a mut ChainState,
}

impl<'a> CommandContext<'a> {
    pub fn command_id(&self) -> CommandId {
        self.id
    }

    pub fn command_name(&self) -> &str {
        self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Position in the chain, starting at 0.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Parameters bound for this call: the static set plus whatever the
    /// current object bound.
    pub fn parameters(&self) -> &BoundParameters {
        self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// The pipeline object being processed, if any.
    pub fn input(&self) -> Option<&Value> {
        self.input
    }

    pub fn preferences(&self) -> &PreferenceSettings {
        &self.preferences
    }

    pub fn adapter(&self) -> &dyn PropertyAdapter {
        self.chain.adapter.as_ref()
    }

    pub fn scripts(&self) -> &ScriptEngine {
        &self.chain.scripts
    }

    /// True once the chain is halting or this command has been cut off.
    pub fn is_stopping(&self) -> bool {
        self.chain.is_halted()
            || self.chain.is_cut(self.index)
            || self.chain.has_preference_stop(self.id)
    }

    /// `Err(Stopped)` when [`is_stopping`](Self::is_stopping); for long-running
    /// loops to call between steps.
    pub fn check_stop(&self) -> CommandResult {
        if self.is_stopping() {
            Err(CommandError::Stopped)
        } else {
            Ok(())
        }
    }

    /// Declare that this command needs no further input. Upstream stages stop
    /// producing and skip `end`; this stage and those after it finish normally.
    pub fn stop_upstream(&mut self) {
        self.chain.cut_upstream(self.index);
        tracing::debug!(command = %self.name, position = self.index, "Upstream input no longer needed");
    }

    fn source(&self) -> RecordSource {
        RecordSource::new(self.id, self.name)
    }

    /// Emit a result object to the next stage (or the host for the last stage).
    pub fn write_object(&mut self, value: impl Into<Value>) -> CommandResult {
        self.check_stop()?;
        if self.phase == Phase::Begin {
            return Err(CommandError::terminating(
                ErrorRecord::new("Objects cannot be written before the pipeline has begun")
                    .with_category(ErrorCategory::InvalidOperation)
                    .with_id("WriteObjectInBegin"),
            ));
        }
        let source = self.source();
        let record = self
            .chain
            .sequencer
            .emit(RecordPayload::Object(value.into()), source);
        deliver(self.downstream, self.chain, record)
    }

    /// Emit each element of an array, or the value itself otherwise.
    pub fn write_enumerated(&mut self, value: Value) -> CommandResult {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.write_object(item)?;
                }
                Ok(())
            }
            other => self.write_object(other),
        }
    }

    /// Report a non-terminating error.
    ///
    /// With `ErrorAction = Stop` the record is still delivered, and the call
    /// then escalates into a terminating fault of this command.
    pub fn write_error(&mut self, mut error: ErrorRecord) -> CommandResult {
        if error.target.is_none() {
            error.target = self.input.cloned();
        }
        error.phase = Some(self.phase);
        self.write_out_of_band(RecordPayload::Error(error))
    }

    pub fn write_warning(&mut self, message: impl Into<String>) -> CommandResult {
        self.write_out_of_band(RecordPayload::Warning(message.into()))
    }

    pub fn write_verbose(&mut self, message: impl Into<String>) -> CommandResult {
        self.write_out_of_band(RecordPayload::Verbose(message.into()))
    }

    pub fn write_debug(&mut self, message: impl Into<String>) -> CommandResult {
        self.write_out_of_band(RecordPayload::Debug(message.into()))
    }

    pub fn write_information(&mut self, record: InformationRecord) -> CommandResult {
        self.write_out_of_band(RecordPayload::Information(record))
    }

    pub fn write_progress(&mut self, record: ProgressRecord) -> CommandResult {
        self.write_out_of_band(RecordPayload::Progress(record))
    }

    fn write_out_of_band(&mut self, payload: RecordPayload) -> CommandResult {
        let kind = payload.kind();
        let preference = self.preferences.for_kind(kind);
        let source = self.source();
        let record = self.chain.sequencer.emit(payload, source);

        if self.preferences.delivers(kind) {
            self.chain.deliver_to_host(record);
        } else {
            tracing::trace!(command = %self.name, ?kind, "Record suppressed by preference");
        }

        if preference == ActionPreference::Stop {
            let error = ErrorRecord::new(format!(
                "The running command stopped because the {:?} preference is set to Stop",
                kind
            ))
            .with_category(ErrorCategory::OperationStopped)
            .with_id("ActionPreferenceStop");
            // Escalates even if the command drops the result.
            self.chain.escalate_after_call(self.id, error.clone());
            return Err(CommandError::terminating(error));
        }
        Ok(())
    }
}
