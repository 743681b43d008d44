//! Built-in command implementations.

pub mod foreach_object;
pub mod measure_object;
pub mod select_object;
pub mod sort_object;
pub mod where_object;
pub mod write_output;

pub use foreach_object::ForEachObject;
pub use measure_object::MeasureObject;
pub use select_object::SelectObject;
pub use sort_object::SortObject;
pub use where_object::{ComparisonOperator, WhereObject};
pub use write_output::WriteOutput;

use crate::pipeline::context::CommandContext;
use crate::pipeline::error::CommandError;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use crate::scripting::ScriptBlock;
use crate::types::Value;

/// The bound `InputObject`, or null.
fn input_object(ctx: &CommandContext<'_>) -> Value {
    ctx.parameter("InputObject").cloned().unwrap_or_default()
}

/// Compile a script parameter; a compile error ends the command.
fn compile_parameter(
    ctx: &CommandContext<'_>,
    parameter: &str,
) -> Result<Option<ScriptBlock>, CommandError> {
    let Some(source) = ctx.parameters().get_str(parameter) else {
        return Ok(None);
    };
    ctx.scripts().compile(source).map(Some).map_err(|e| {
        CommandError::terminating(
            ErrorRecord::new(format!("{}: {}", parameter, e))
                .with_category(ErrorCategory::ParserError)
                .with_id("ScriptCompileFailed"),
        )
    })
}

/// Script runtime failures skip the current object only.
fn script_failed(err: crate::error::EngineError) -> CommandError {
    CommandError::non_terminating(
        ErrorRecord::new(err.to_string())
            .with_category(ErrorCategory::InvalidOperation)
            .with_id("ScriptFailed"),
    )
}

/// Values of an array-typed string list parameter.
fn string_list(ctx: &CommandContext<'_>, parameter: &str) -> Vec<String> {
    match ctx.parameter(parameter) {
        Some(Value::Array(items)) => items.iter().map(|v| v.to_string()).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}
