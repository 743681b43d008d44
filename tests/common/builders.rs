//! Test commands that record every lifecycle call they receive

use cmdpipe::pipeline::{
    Command, CommandContext, CommandError, CommandFault, CommandResult, ErrorRecord,
    ParameterMetadata, Phase, StopToken,
};
use cmdpipe::{Value, ValueType};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared, ordered log of `"<name>:<event>"` entries
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries of one command, without the name prefix
    pub fn of(&self, name: &str) -> Vec<String> {
        let prefix = format!("{}:", name);
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Index of the first entry equal to `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }
}

static PASS_THROUGH: &[ParameterMetadata] =
    &[ParameterMetadata::new("InputObject", ValueType::Any).by_value()];

static PRODUCER: &[ParameterMetadata] = &[];

/// A configurable command that logs `begin`, `process:<value>`, `end`,
/// `stop` and `dispose`.
pub struct RecordingCommand {
    name: String,
    log: EventLog,
    parameters: &'static [ParameterMetadata],
    produce: Vec<Value>,
    fault: Option<(Phase, bool)>,
    fault_on: Option<(Value, bool)>,
    cut_after: Option<usize>,
    signal_after: Option<(usize, StopToken)>,
    write_in_begin: bool,
    dispose_fault: bool,
    dispose_panic: bool,
    delay: Option<Duration>,
    processed: usize,
}

impl RecordingCommand {
    /// Passes each input object through unchanged
    pub fn pass_through(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            parameters: PASS_THROUGH,
            produce: Vec::new(),
            fault: None,
            fault_on: None,
            cut_after: None,
            signal_after: None,
            write_in_begin: false,
            dispose_fault: false,
            dispose_panic: false,
            delay: None,
            processed: 0,
        }
    }

    /// Takes no pipeline input; writes `values` from its single `process`
    pub fn producer(name: &str, log: &EventLog, values: Vec<Value>) -> Self {
        Self {
            parameters: PRODUCER,
            produce: values,
            ..Self::pass_through(name, log)
        }
    }

    /// Use a custom parameter table
    pub fn with_parameters(mut self, parameters: &'static [ParameterMetadata]) -> Self {
        self.parameters = parameters;
        self
    }

    /// Fault in `phase`; terminating or not
    pub fn fault_in(mut self, phase: Phase, terminating: bool) -> Self {
        self.fault = Some((phase, terminating));
        self
    }

    /// Fault for one specific input object; terminating or not
    pub fn fault_on(mut self, value: impl Into<Value>, terminating: bool) -> Self {
        self.fault_on = Some((value.into(), terminating));
        self
    }

    /// Declare upstream input unneeded after `n` objects
    pub fn cut_after(mut self, n: usize) -> Self {
        self.cut_after = Some(n);
        self
    }

    /// Signal `token` after `n` objects
    pub fn signal_after(mut self, n: usize, token: StopToken) -> Self {
        self.signal_after = Some((n, token));
        self
    }

    pub fn write_in_begin(mut self) -> Self {
        self.write_in_begin = true;
        self
    }

    pub fn dispose_fault(mut self) -> Self {
        self.dispose_fault = true;
        self
    }

    pub fn dispose_panic(mut self) -> Self {
        self.dispose_panic = true;
        self
    }

    /// Sleep this long per object
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn log(&self, event: impl AsRef<str>) {
        self.log.push(format!("{}:{}", self.name, event.as_ref()));
    }

    fn check_fault(&self, phase: Phase) -> CommandResult {
        match self.fault {
            Some((p, terminating)) if p == phase => {
                let error = ErrorRecord::new(format!("{} failed in {}", self.name, phase))
                    .with_id("TestFault");
                Err(if terminating {
                    CommandError::terminating(error)
                } else {
                    CommandError::non_terminating(error)
                })
            }
            _ => Ok(()),
        }
    }
}

impl Command for RecordingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        self.parameters
    }

    fn begin(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        self.log("begin");
        self.check_fault(Phase::Begin)?;
        if self.write_in_begin {
            ctx.write_object("too early")?;
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        if self.parameters.is_empty() {
            self.log("process");
            self.check_fault(Phase::Process)?;
            for value in self.produce.clone() {
                ctx.write_object(value)?;
            }
            return Ok(());
        }

        let value = ctx.input().cloned().unwrap_or_default();
        self.log(format!("process:{}", value));
        self.processed += 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.check_fault(Phase::Process)?;
        if let Some((target, terminating)) = &self.fault_on {
            if *target == value {
                let error =
                    ErrorRecord::new(format!("{} rejected {}", self.name, value)).with_id("Rejected");
                return Err(if *terminating {
                    CommandError::terminating(error)
                } else {
                    CommandError::non_terminating(error)
                });
            }
        }

        ctx.write_object(value)?;

        if self.cut_after == Some(self.processed) {
            ctx.stop_upstream();
        }
        if let Some((n, token)) = &self.signal_after {
            if *n == self.processed {
                token.signal();
            }
        }
        Ok(())
    }

    fn end(&mut self, _ctx: &mut CommandContext<'_>) -> CommandResult {
        self.log("end");
        self.check_fault(Phase::End)
    }

    fn stop(&mut self) {
        self.log("stop");
    }

    fn dispose(&mut self) -> Result<(), CommandFault> {
        self.log("dispose");
        if self.dispose_panic {
            panic!("{} panicked while disposing", self.name);
        }
        if self.dispose_fault {
            return Err(CommandFault::non_terminating(
                ErrorRecord::new(format!("{} could not release its handle", self.name))
                    .with_id("HandleLeak"),
            ));
        }
        Ok(())
    }
}
