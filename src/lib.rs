//! # cmdpipe: an object pipeline engine
//!
//! Commands are chained so that the structured objects written by one become
//! the input of the next. The engine binds parameters (from arguments and from
//! each pipeline object), drives every command through its lifecycle, keeps
//! out-of-band streams (errors, warnings, verbose, debug, information,
//! progress) separate from results, and releases every command exactly once.
//!
//! ## Architecture
//!
//! - **Types**: [`Value`] objects with shell-style comparison and conversion
//! - **Adapter**: property lookup and type conversion behind [`PropertyAdapter`]
//! - **Pipeline**: binder, lifecycle, pipes, coordinator and disposal
//! - **Scripting**: Rhai script blocks for `Where-Object` and `ForEach-Object`
//! - **Config**: TOML defaults for preferences, binding policy, script limits and logging
//!
//! ## Configuration
//!
//! Defaults are read from `$CMDPIPE_CONFIG` or the platform config directory:
//!
//! - **Linux**: `~/.config/cmdpipe/config.toml`
//! - **macOS**: `~/Library/Application Support/cmdpipe/config.toml`
//! - **Windows**: `%APPDATA%\cmdpipe\config.toml`
//!
//! ## Example
//!
//! ```ignore
//! use cmdpipe::pipeline::{CommandRegistry, CommandSpec, Pipeline};
//!
//! let registry = CommandRegistry::new();
//! let outcome = Pipeline::builder()
//!     .command(CommandSpec::new(registry.create("Where-Object")?).arg("item > 1"))
//!     .command(CommandSpec::new(registry.create("Sort-Object")?).switch("Descending"))
//!     .build()
//!     .invoke_with_input([3, 1, 2]);
//!
//! assert_eq!(outcome.output_values(), vec![3.into(), 2.into()]);
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scripting;
pub mod types;

// Re-export commonly used types
pub use adapter::{default_adapter, PropertyAdapter};
pub use config::{ActionPreference, EngineConfig};
pub use error::{EngineError, Result};
pub use pipeline::{
    Command, CommandContext, CommandRegistry, CommandSpec, Pipeline, PipelineBuilder,
    PipelineDefinition, PipelineJob, PipelineOutcome, PipelineStatus, StopToken,
};
pub use scripting::{ScriptBlock, ScriptEngine};
pub use types::{Value, ValueType};
