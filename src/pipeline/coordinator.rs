//! Pipeline coordinator: drives one chain of commands to completion.
//!
//! Execution order for a chain of N commands:
//! 1. Static binding for every command. Any failure aborts before `begin`.
//! 2. `begin` on every command, first to last.
//! 3. Feed the head. Each object is pushed through every stage before the
//!    next one is produced; at most one object is in flight per pipe.
//! 4. Termination wave: for k = 0..N, drain stage k's input pipe, call `end`,
//!    close stage k+1's input pipe.
//! 5. If the chain halted, stages still running get the `stop` hook.
//! 6. Release every command, last to first.
//!
//! ```text
//! host input ──► [0] ──pipe──► [1] ──pipe──► [2] ──► host timeline
//!                 │             │             │
//!                 └─────────────┴─────────────┴── out-of-band ──► host timeline
//! ```

use crate::adapter::{default_adapter, PropertyAdapter};
use crate::config::{ActionPreference, BindingErrorAction, EngineConfig, PreferenceSettings};
use crate::pipeline::binder::ParameterBinder;
use crate::pipeline::bridge::HostMessage;
use crate::pipeline::command::{AnyCommand, Command};
use crate::pipeline::context::CommandContext;
use crate::pipeline::disposal::{DisposalManager, Release};
use crate::pipeline::error::{
    BindingError, CommandError, CommandFault, CommandResult, PipeError,
};
use crate::pipeline::id::CommandId;
use crate::pipeline::lifecycle::{CommandState, Phase};
use crate::pipeline::parameter::{BoundParameters, CommandArgument};
use crate::pipeline::pipe::{Pipe, PipeRead};
use crate::pipeline::record::{
    ErrorRecord, Record, RecordKind, RecordPayload, RecordSequencer, RecordSource,
};
use crate::pipeline::stop::StopToken;
use crate::scripting::ScriptEngine;
use crate::types::Value;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Aggregate completion status of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStatus {
    Succeeded,
    Failed,
    Stopped,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Succeeded => "Succeeded",
            PipelineStatus::Failed => "Failed",
            PipelineStatus::Stopped => "Stopped",
        };
        f.write_str(s)
    }
}

/// What the host receives when a chain completes.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub status: PipelineStatus,
    /// Tail objects and every delivered out-of-band record, in emission order.
    pub records: Vec<Record>,
    /// The error that failed the chain, if any.
    pub terminal_fault: Option<ErrorRecord>,
}

impl PipelineOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == PipelineStatus::Succeeded
    }

    pub fn of_kind(&self, kind: RecordKind) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.kind() == kind)
    }

    /// Object records reaching the host.
    pub fn output(&self) -> impl Iterator<Item = &Record> {
        self.of_kind(RecordKind::Object)
    }

    pub fn output_values(&self) -> Vec<Value> {
        self.output().filter_map(Record::as_object).cloned().collect()
    }

    pub fn errors(&self) -> Vec<&ErrorRecord> {
        self.records.iter().filter_map(Record::as_error).collect()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.messages(RecordKind::Warning)
    }

    pub fn verbose(&self) -> Vec<&str> {
        self.messages(RecordKind::Verbose)
    }

    pub fn debug(&self) -> Vec<&str> {
        self.messages(RecordKind::Debug)
    }

    pub fn information(&self) -> Vec<&Record> {
        self.of_kind(RecordKind::Information).collect()
    }

    pub fn progress(&self) -> Vec<&Record> {
        self.of_kind(RecordKind::Progress).collect()
    }

    fn messages(&self, kind: RecordKind) -> Vec<&str> {
        self.of_kind(kind).filter_map(Record::as_message).collect()
    }
}

/// A command plus what the caller supplied for it.
pub struct CommandSpec {
    pub command: AnyCommand,
    pub arguments: Vec<CommandArgument>,
    /// Overrides the chain's `binding.pipeline_errors` for this command.
    pub binding_errors: Option<BindingErrorAction>,
}

impl CommandSpec {
    pub fn new(command: impl Into<AnyCommand>) -> Self {
        Self {
            command: command.into(),
            arguments: Vec::new(),
            binding_errors: None,
        }
    }

    pub fn plugin(command: impl Command + 'static) -> Self {
        Self::new(AnyCommand::plugin(command))
    }

    /// Positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(CommandArgument::positional(value));
        self
    }

    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.push(CommandArgument::named(name, value));
        self
    }

    pub fn switch(mut self, name: impl Into<String>) -> Self {
        self.arguments.push(CommandArgument::switch(name));
        self
    }

    pub fn argument(mut self, argument: CommandArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn binding_errors(mut self, action: BindingErrorAction) -> Self {
        self.binding_errors = Some(action);
        self
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("arguments", &self.arguments)
            .field("binding_errors", &self.binding_errors)
            .finish()
    }
}

/// One command of a chain together with its input pipe and engine state.
pub(crate) struct Stage {
    pub(crate) index: usize,
    pub(crate) id: CommandId,
    pub(crate) name: String,
    pub(crate) command: AnyCommand,
    pub(crate) arguments: Vec<CommandArgument>,
    pub(crate) state: CommandState,
    pub(crate) static_bound: BoundParameters,
    pub(crate) preferences: PreferenceSettings,
    pub(crate) binding_errors: BindingErrorAction,
    pub(crate) accepts_input: bool,
    pub(crate) input: Pipe,
}

impl Stage {
    fn source(&self) -> RecordSource {
        RecordSource::new(self.id, self.name.clone())
    }
}

impl Release for Stage {
    fn command_id(&self) -> CommandId {
        self.id
    }

    fn is_released(&self) -> bool {
        self.state.is_disposed()
    }

    fn release(&mut self) -> Result<(), CommandFault> {
        if self.state.is_running() {
            self.command.stop();
            self.state.transition(CommandState::Stopped)?;
        }
        let result = self.command.dispose();
        self.state.transition(CommandState::Disposed)?;
        result
    }
}

/// State shared by every stage of one chain.
pub(crate) struct ChainState {
    pub(crate) sequencer: RecordSequencer,
    pub(crate) records: Vec<Record>,
    pub(crate) live: Option<Sender<HostMessage>>,
    /// Child of the host's token.
    pub(crate) stop: StopToken,
    pub(crate) fault: Option<ErrorRecord>,
    /// Stages before this index no longer produce.
    pub(crate) upstream_cut: Option<usize>,
    /// A write under a `Stop` preference, escalated when the call settles.
    pub(crate) preference_stop: Option<(CommandId, ErrorRecord)>,
    pub(crate) adapter: Arc<dyn PropertyAdapter>,
    pub(crate) scripts: Arc<ScriptEngine>,
}

impl ChainState {
    pub(crate) fn is_halted(&self) -> bool {
        self.stop.is_signaled()
    }

    pub(crate) fn is_cut(&self, index: usize) -> bool {
        self.upstream_cut.is_some_and(|cut| index < cut)
    }

    pub(crate) fn cut_upstream(&mut self, index: usize) {
        let cut = self.upstream_cut.map_or(index, |existing| existing.max(index));
        self.upstream_cut = Some(cut);
    }

    pub(crate) fn deliver_to_host(&mut self, record: Record) {
        tracing::trace!(kind = ?record.kind(), sequence = record.sequence(), source = %record.source().name, "Record delivered to host");
        if let Some(live) = &self.live {
            if live.send(HostMessage::Record(record.clone())).is_err() {
                tracing::warn!("Live host channel disconnected; records are still collected");
                self.live = None;
            }
        }
        self.records.push(record);
    }

    /// Escalate the current call of `id` once it returns, whatever it returns.
    pub(crate) fn escalate_after_call(&mut self, id: CommandId, error: ErrorRecord) {
        if self.preference_stop.is_none() {
            self.preference_stop = Some((id, error));
        }
    }

    fn take_preference_stop(&mut self, id: CommandId) -> Option<ErrorRecord> {
        match &self.preference_stop {
            Some((owner, _)) if *owner == id => self.preference_stop.take().map(|(_, e)| e),
            _ => None,
        }
    }

    pub(crate) fn has_preference_stop(&self, id: CommandId) -> bool {
        matches!(&self.preference_stop, Some((owner, _)) if *owner == id)
    }

    fn emit_error(&mut self, source: RecordSource, error: ErrorRecord) {
        let record = self.sequencer.emit(RecordPayload::Error(error), source);
        self.deliver_to_host(record);
    }

    /// Record a terminating fault of `stage` and halt the chain.
    fn fail(&mut self, stage: &mut Stage, mut error: ErrorRecord) {
        error.terminating = true;
        tracing::error!(command = %stage.name, %error, "Terminating fault");
        if stage.state.transition(CommandState::Error).is_err() {
            tracing::debug!(command = %stage.name, state = %stage.state, "Fault outside a running phase");
        }
        self.emit_error(stage.source(), error.clone());
        if self.fault.is_none() {
            self.fault = Some(error);
        }
        self.stop.signal();
    }
}

/// Push `record` into the first of `stages` and let it process the object.
/// With no stages left the record belongs to the host.
pub(crate) fn deliver(stages: &mut [Stage], chain: &mut ChainState, record: Record) -> CommandResult {
    let Some((stage, rest)) = stages.split_first_mut() else {
        chain.deliver_to_host(record);
        return Ok(());
    };
    if chain.is_halted() {
        return Err(CommandError::Stopped);
    }

    stage.input.write(record).map_err(|err| match err {
        PipeError::Stopped => CommandError::Stopped,
        other => CommandError::Fault(other.into()),
    })?;

    match stage.input.read() {
        PipeRead::Record(record) => process_record(stage, rest, chain, record),
        PipeRead::Empty | PipeRead::EndOfInput => Ok(()),
    }
}

fn process_record(
    stage: &mut Stage,
    rest: &mut [Stage],
    chain: &mut ChainState,
    record: Record,
) -> CommandResult {
    let Some(value) = record.into_object() else {
        return Ok(());
    };
    if !stage.state.is_running() {
        return Ok(());
    }

    let bound = if stage.accepts_input {
        ParameterBinder::new(stage.command.parameters(), chain.adapter.as_ref())
            .bind_pipeline_object(&stage.static_bound, &value)
    } else {
        Err(BindingError::NoParameterAcceptsInput)
    };

    match bound {
        Ok(bound) => invoke(stage, rest, chain, Phase::Process, Some(&bound), Some(&value)),
        Err(err) => {
            let mut error = err.to_error_record().with_target(value);
            error.phase = Some(Phase::Process);
            match stage.binding_errors {
                BindingErrorAction::NonTerminating => {
                    tracing::debug!(command = %stage.name, %err, "Object skipped");
                    chain.emit_error(stage.source(), error);
                    Ok(())
                }
                BindingErrorAction::Terminating => {
                    chain.fail(stage, error);
                    Err(CommandError::Stopped)
                }
            }
        }
    }
}

/// Run one lifecycle call of `stage` and settle its outcome.
fn invoke(
    stage: &mut Stage,
    rest: &mut [Stage],
    chain: &mut ChainState,
    phase: Phase,
    bound: Option<&BoundParameters>,
    input: Option<&Value>,
) -> CommandResult {
    let next = match phase {
        Phase::Begin => Some(CommandState::Began),
        Phase::Process => Some(CommandState::Processing),
        _ => None,
    };
    if let Some(next) = next {
        if let Err(err) = stage.state.transition(next) {
            chain.fail(stage, CommandFault::from(err).error);
            return Err(CommandError::Stopped);
        }
    }
    tracing::debug!(command = %stage.name, %phase, "Lifecycle call");

    let result = {
        let mut ctx = CommandContext {
            id: stage.id,
            index: stage.index,
            name: &stage.name,
            phase,
            parameters: bound.unwrap_or(&stage.static_bound),
            input,
            preferences: stage.preferences,
            downstream: rest,
            chain: &mut *chain,
        };
        match phase {
            Phase::Begin => stage.command.begin(&mut ctx),
            Phase::Process => stage.command.process(&mut ctx),
            _ => stage.command.end(&mut ctx),
        }
    };

    settle(stage, chain, phase, input, result)
}

fn settle(
    stage: &mut Stage,
    chain: &mut ChainState,
    phase: Phase,
    input: Option<&Value>,
    result: CommandResult,
) -> CommandResult {
    // The record itself was delivered by the write; only the stop is left.
    if let Some(mut error) = chain.take_preference_stop(stage.id) {
        error.phase = Some(phase);
        chain.fail(stage, error);
        return Err(CommandError::Stopped);
    }

    let fault = match result {
        Ok(()) => return Ok(()),
        Err(CommandError::Stopped) => return Err(CommandError::Stopped),
        Err(CommandError::Fault(fault)) => fault,
    };

    let terminating =
        fault.is_terminating() || stage.preferences.error_action == ActionPreference::Stop;
    let mut error = fault.error;
    error.phase = Some(phase);
    if error.target.is_none() {
        error.target = input.cloned();
    }

    if terminating {
        chain.fail(stage, error);
        Err(CommandError::Stopped)
    } else {
        tracing::debug!(command = %stage.name, %error, "Non-terminating fault");
        chain.emit_error(stage.source(), error);
        Ok(())
    }
}

/// A chain of commands ready to run once.
pub struct Pipeline {
    stages: Vec<Stage>,
    chain: ChainState,
    disposal: DisposalManager,
    started: bool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Command names in chain order.
    pub fn command_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// The chain's own token. Signalling it stops this chain only.
    pub fn stop_token(&self) -> StopToken {
        self.chain.stop.clone()
    }

    /// Run with no host input: the head's `process` runs once.
    pub fn invoke(self) -> PipelineOutcome {
        self.run(None)
    }

    /// Run with `input` fed into the head, one object at a time.
    pub fn invoke_with_input<I>(self, input: I) -> PipelineOutcome
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.run(Some(input.into_iter().map(Into::into).collect()))
    }

    fn run(mut self, input: Option<Vec<Value>>) -> PipelineOutcome {
        self.started = true;
        tracing::info!(commands = ?self.command_names(), "Pipeline starting");

        self.bind_all(input.is_some());
        self.begin_all();
        self.feed_head(input);
        self.end_wave();
        self.stop_running();
        self.release_all();

        let status = if self.chain.fault.is_some() {
            PipelineStatus::Failed
        } else if self.chain.is_halted() {
            PipelineStatus::Stopped
        } else {
            PipelineStatus::Succeeded
        };
        let terminal_fault = self.chain.fault.clone();
        tracing::info!(%status, records = self.chain.records.len(), "Pipeline completed");

        if let Some(live) = self.chain.live.take() {
            let message = HostMessage::Completed {
                status,
                terminal_fault: terminal_fault.clone(),
            };
            if live.send(message).is_err() {
                tracing::warn!("Live host channel disconnected before completion");
            }
        }

        PipelineOutcome {
            status,
            records: std::mem::take(&mut self.chain.records),
            terminal_fault,
        }
    }

    fn bind_all(&mut self, host_input: bool) {
        let chain = &mut self.chain;
        for stage in self.stages.iter_mut() {
            let expects_input = stage.index > 0 || host_input;
            let bound = ParameterBinder::new(stage.command.parameters(), chain.adapter.as_ref())
                .bind_named(&stage.arguments, expects_input)
                .and_then(|bound| {
                    let prefs = stage.preferences.apply_common(&bound)?;
                    Ok((bound, prefs))
                });
            match bound {
                Ok((bound, prefs)) => {
                    stage.static_bound = bound;
                    stage.preferences = prefs;
                }
                Err(err) => {
                    let mut error = err.to_error_record();
                    error.phase = Some(Phase::Bind);
                    chain.fail(stage, error);
                    return;
                }
            }
        }
    }

    fn begin_all(&mut self) {
        for k in 0..self.stages.len() {
            if self.chain.is_halted() {
                return;
            }
            let Some((stage, rest)) = self.stages[k..].split_first_mut() else {
                return;
            };
            if invoke(stage, rest, &mut self.chain, Phase::Begin, None, None).is_err() {
                return;
            }
        }
    }

    fn feed_head(&mut self, input: Option<Vec<Value>>) {
        if self.chain.is_halted() || self.stages.is_empty() {
            return;
        }
        match input {
            Some(values) => {
                for value in values {
                    if self.chain.is_halted() || self.chain.upstream_cut.is_some() {
                        tracing::debug!("Head input no longer requested");
                        break;
                    }
                    let record = self
                        .chain
                        .sequencer
                        .emit(RecordPayload::Object(value), RecordSource::host());
                    if let Err(err) = deliver(&mut self.stages, &mut self.chain, record) {
                        tracing::trace!(%err, "Head delivery interrupted");
                    }
                }
            }
            None => {
                if let Some((head, rest)) = self.stages.split_first_mut() {
                    if let Err(err) = invoke(head, rest, &mut self.chain, Phase::Process, None, None) {
                        tracing::trace!(%err, "Head process interrupted");
                    }
                }
            }
        }
        if let Some(head) = self.stages.first_mut() {
            head.input.close();
        }
    }

    fn end_wave(&mut self) {
        for k in 0..self.stages.len() {
            if self.chain.is_halted() {
                return;
            }
            if self.chain.is_cut(k) {
                continue;
            }
            let Some((stage, rest)) = self.stages[k..].split_first_mut() else {
                return;
            };

            // `end` only after the input pipe reports end-of-input.
            loop {
                match stage.input.read() {
                    PipeRead::Record(record) => {
                        if process_record(stage, rest, &mut self.chain, record).is_err() {
                            break;
                        }
                    }
                    PipeRead::Empty => stage.input.close(),
                    PipeRead::EndOfInput => break,
                }
            }
            if self.chain.is_halted() {
                return;
            }

            // Commands without pipeline parameters still process once.
            let process_once = !stage.accepts_input && stage.state == CommandState::Began;
            if process_once
                && invoke(stage, rest, &mut self.chain, Phase::Process, None, None).is_err()
                && self.chain.is_halted()
            {
                return;
            }

            if stage.state.is_running()
                && invoke(stage, rest, &mut self.chain, Phase::End, None, None).is_ok()
                && stage.state.transition(CommandState::Ended).is_err()
            {
                tracing::debug!(command = %stage.name, state = %stage.state, "End completed outside a running state");
            }

            if let Some(next) = rest.first_mut() {
                next.input.close();
            }
        }
    }

    /// Abrupt-stop hook for every command that began but never ended.
    fn stop_running(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.input.close();
            if stage.state.is_running() {
                tracing::debug!(command = %stage.name, "Stopping command");
                stage.command.stop();
                if let Err(err) = stage.state.transition(CommandState::Stopped) {
                    tracing::warn!(command = %stage.name, %err, "Stop transition rejected");
                }
            }
        }
    }

    fn release_all(&mut self) {
        let faults = self.disposal.release_all(&mut self.stages);
        for fault in faults {
            let source = self
                .stages
                .iter()
                .find(|s| s.id == fault.command)
                .map(Stage::source)
                .unwrap_or_else(RecordSource::host);
            self.chain.emit_error(source, fault.error);
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.stages.iter().all(|s| s.is_released()) {
            return;
        }
        if self.started {
            tracing::warn!("Pipeline unwound with unreleased commands; releasing");
        }
        for fault in self.disposal.release_all(&mut self.stages) {
            tracing::warn!(command = %fault.command, error = %fault.error, "Cleanup fault during unwind");
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("commands", &self.command_names())
            .field("started", &self.started)
            .finish()
    }
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    config: EngineConfig,
    adapter: Option<Arc<dyn PropertyAdapter>>,
    scripts: Option<Arc<ScriptEngine>>,
    live: Option<Sender<HostMessage>>,
    host_stop: StopToken,
    commands: Vec<CommandSpec>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            adapter: None,
            scripts: None,
            live: None,
            host_stop: StopToken::new(),
            commands: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn adapter(mut self, adapter: Arc<dyn PropertyAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Share one script engine between chains.
    pub fn scripts(mut self, scripts: Arc<ScriptEngine>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Also send each host record over `sender` as it is delivered.
    pub fn live(mut self, sender: Sender<HostMessage>) -> Self {
        self.live = Some(sender);
        self
    }

    /// Run under a child of `token`.
    pub fn stop_token(mut self, token: StopToken) -> Self {
        self.host_stop = token;
        self
    }

    pub fn command(mut self, spec: CommandSpec) -> Self {
        self.commands.push(spec);
        self
    }

    pub fn build(self) -> Pipeline {
        let stop = self.host_stop.child();
        let default_errors = self.config.binding.pipeline_errors;
        let preferences = self.config.preferences;

        let stages = self
            .commands
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let name = spec.command.name().to_string();
                let accepts_input = spec
                    .command
                    .parameters()
                    .iter()
                    .any(|p| p.accepts_pipeline_input());
                Stage {
                    index,
                    id: CommandId(index as u32),
                    name,
                    command: spec.command,
                    arguments: spec.arguments,
                    state: CommandState::Created,
                    static_bound: BoundParameters::new(),
                    preferences,
                    binding_errors: spec.binding_errors.unwrap_or(default_errors),
                    accepts_input,
                    input: Pipe::new(stop.clone()),
                }
            })
            .collect();

        let scripts = self
            .scripts
            .unwrap_or_else(|| Arc::new(ScriptEngine::with_settings(self.config.scripting)));

        Pipeline {
            stages,
            chain: ChainState {
                sequencer: RecordSequencer::new(),
                records: Vec::new(),
                live: self.live,
                stop,
                fault: None,
                upstream_cut: None,
                preference_stop: None,
                adapter: self.adapter.unwrap_or_else(default_adapter),
                scripts,
            },
            disposal: DisposalManager::new(),
            started: false,
        }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("commands", &self.commands)
            .field("live", &self.live.is_some())
            .finish()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
