//! Command pipeline engine.
//!
//! A chain of commands exchanges structured objects through capacity-1 pipes.
//! Every command runs the lifecycle `begin → process* → end`, and every
//! command is released exactly once, last to first, however the chain ends.
//!
//! # Architecture
//!
//! ```text
//! host input ──► [Write-Output] ──► [Where-Object] ──► [Sort-Object] ──► host
//!                      │                  │                  │
//!                      └──────────────────┴──────────────────┴── error / warning /
//!                                                               verbose / ... ──► host
//! ```
//!
//! # Design
//!
//! - **Enum dispatch for built-ins**: `BuiltinCommand` covers the built-in
//!   commands; hosts plug in their own through `Box<dyn Command>`.
//! - **Synchronous push**: a write hands the object straight to the next
//!   stage, so no pipe ever holds more than one object.
//! - **Static parameter tables**: commands declare `&'static [ParameterMetadata]`.
//! - **Hierarchical stop**: each chain runs under a child of the host's token.
//! - **Background jobs**: `PipelineJob` runs a chain on its own thread and
//!   streams records over a crossbeam channel.

pub mod binder;
pub mod bridge;
pub mod command;
pub mod commands;
pub mod context;
pub mod coordinator;
pub mod definition;
pub mod disposal;
pub mod error;
pub mod id;
pub mod lifecycle;
pub mod parameter;
pub mod pipe;
pub mod record;
pub mod registry;
pub mod stop;

pub use binder::ParameterBinder;
pub use bridge::{HostMessage, PipelineJob};
pub use command::{AnyCommand, BuiltinCommand, Command};
pub use context::CommandContext;
pub use coordinator::{CommandSpec, Pipeline, PipelineBuilder, PipelineOutcome, PipelineStatus};
pub use definition::{CommandDefinition, PipelineDefinition};
pub use disposal::{CleanupFault, DisposalManager, Release};
pub use error::{
    BindingError, CommandError, CommandFault, CommandResult, FaultKind, LifecycleError, PipeError,
};
pub use id::CommandId;
pub use lifecycle::{CommandState, Phase};
pub use parameter::{
    BindingSource, BoundParameter, BoundParameters, CommandArgument, ParameterMetadata,
    PipelineBinding, COMMON_PARAMETERS,
};
pub use pipe::{Pipe, PipeRead};
pub use record::{
    ErrorCategory, ErrorRecord, InformationRecord, ProgressRecord, Record, RecordKind,
    RecordPayload, RecordSequencer, RecordSource,
};
pub use registry::{CommandRegistry, CommandType};
pub use stop::StopToken;
