//! Command lifecycle contract.
//!
//! Two-layer design:
//! - **`Command` trait**: implemented by every command, built-in or not.
//! - **`BuiltinCommand` enum**: the built-in commands, dispatched by `match`
//!   so the per-object path avoids a virtual call.
//!
//! `AnyCommand` wraps either variant so the coordinator handles both uniformly.
//! The coordinator never touches a command's state beyond these methods.

use crate::pipeline::commands::{
    ForEachObject, MeasureObject, SelectObject, SortObject, WhereObject, WriteOutput,
};
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::{CommandFault, CommandResult};
use crate::pipeline::parameter::ParameterMetadata;

/// A unit of pipeline work.
pub trait Command: Send {
    /// Display name used to tag records.
    fn name(&self) -> &str;

    /// Declared parameters.
    fn parameters(&self) -> &[ParameterMetadata];

    /// Called once, after static binding and before any object arrives.
    fn begin(&mut self, _ctx: &mut CommandContext<'_>) -> CommandResult {
        Ok(())
    }

    /// Called once per input object, or once in total for commands that take
    /// no pipeline input.
    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult;

    /// Called once after upstream input is exhausted.
    fn end(&mut self, _ctx: &mut CommandContext<'_>) -> CommandResult {
        Ok(())
    }

    /// Abrupt-stop hook, called instead of `end` when the chain halts.
    fn stop(&mut self) {}

    /// Release external resources. Called exactly once on every exit path.
    fn dispose(&mut self) -> Result<(), CommandFault> {
        Ok(())
    }
}

/// Enum dispatch for built-in commands.
#[derive(Debug)]
pub enum BuiltinCommand {
    WriteOutput(WriteOutput),
    WhereObject(WhereObject),
    ForEachObject(ForEachObject),
    SelectObject(SelectObject),
    SortObject(SortObject),
    MeasureObject(MeasureObject),
}

macro_rules! dispatch {
    ($self:expr, $cmd:ident => $call:expr) => {
        match $self {
            BuiltinCommand::WriteOutput($cmd) => $call,
            BuiltinCommand::WhereObject($cmd) => $call,
            BuiltinCommand::ForEachObject($cmd) => $call,
            BuiltinCommand::SelectObject($cmd) => $call,
            BuiltinCommand::SortObject($cmd) => $call,
            BuiltinCommand::MeasureObject($cmd) => $call,
        }
    };
}

impl Command for BuiltinCommand {
    fn name(&self) -> &str {
        dispatch!(self, c => c.name())
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        dispatch!(self, c => c.parameters())
    }

    fn begin(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        dispatch!(self, c => c.begin(ctx))
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        dispatch!(self, c => c.process(ctx))
    }

    fn end(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        dispatch!(self, c => c.end(ctx))
    }

    fn stop(&mut self) {
        dispatch!(self, c => c.stop())
    }

    fn dispose(&mut self) -> Result<(), CommandFault> {
        dispatch!(self, c => c.dispose())
    }
}

/// Either a built-in command or a plugin.
pub enum AnyCommand {
    Builtin(BuiltinCommand),
    Plugin(Box<dyn Command>),
}

impl AnyCommand {
    pub fn plugin(command: impl Command + 'static) -> Self {
        AnyCommand::Plugin(Box::new(command))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, AnyCommand::Builtin(_))
    }
}

impl std::fmt::Debug for AnyCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyCommand::Builtin(c) => f.debug_tuple("Builtin").field(c).finish(),
            AnyCommand::Plugin(c) => f.debug_tuple("Plugin").field(&c.name()).finish(),
        }
    }
}

impl From<BuiltinCommand> for AnyCommand {
    fn from(command: BuiltinCommand) -> Self {
        AnyCommand::Builtin(command)
    }
}

impl From<Box<dyn Command>> for AnyCommand {
    fn from(command: Box<dyn Command>) -> Self {
        AnyCommand::Plugin(command)
    }
}

impl Command for AnyCommand {
    fn name(&self) -> &str {
        match self {
            AnyCommand::Builtin(c) => c.name(),
            AnyCommand::Plugin(c) => c.name(),
        }
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        match self {
            AnyCommand::Builtin(c) => c.parameters(),
            AnyCommand::Plugin(c) => c.parameters(),
        }
    }

    fn begin(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        match self {
            AnyCommand::Builtin(c) => c.begin(ctx),
            AnyCommand::Plugin(c) => c.begin(ctx),
        }
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        match self {
            AnyCommand::Builtin(c) => c.process(ctx),
            AnyCommand::Plugin(c) => c.process(ctx),
        }
    }

    fn end(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        match self {
            AnyCommand::Builtin(c) => c.end(ctx),
            AnyCommand::Plugin(c) => c.end(ctx),
        }
    }

    fn stop(&mut self) {
        match self {
            AnyCommand::Builtin(c) => c.stop(),
            AnyCommand::Plugin(c) => c.stop(),
        }
    }

    fn dispose(&mut self) -> Result<(), CommandFault> {
        match self {
            AnyCommand::Builtin(c) => c.dispose(),
            AnyCommand::Plugin(c) => c.dispose(),
        }
    }
}
