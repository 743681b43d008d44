//! ForEach-Object: runs a script block (or reads a member) for each input.
//!
//! ## Script Interface
//!
//! The current object is bound to `item`. Variables declared in the
//! `-Begin` block stay visible to `-Process` and `-End`:
//!
//! ```rhai
//! // -Begin
//! let total = 0;
//! // -Process
//! total += item.Size;
//! item.Name
//! // -End
//! total
//! ```
//!
//! A non-unit result is written downstream; arrays are enumerated.

use super::{compile_parameter, input_object, script_failed};
use crate::pipeline::command::Command;
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::{CommandError, CommandResult};
use crate::pipeline::parameter::ParameterMetadata;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use crate::scripting::ScriptBlock;
use crate::types::{Value, ValueType};
use rhai::Scope;

static PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("Process", ValueType::String).position(0),
    ParameterMetadata::new("Begin", ValueType::String),
    ParameterMetadata::new("End", ValueType::String),
    ParameterMetadata::new("MemberName", ValueType::String),
    ParameterMetadata::new("InputObject", ValueType::Any).by_value(),
];

#[derive(Debug, Default)]
pub struct ForEachObject {
    process: Option<ScriptBlock>,
    end: Option<ScriptBlock>,
    member: Option<String>,
    scope: Scope<'static>,
    /// Output of the begin block, written once objects may flow.
    pending: Vec<Value>,
}

impl ForEachObject {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_pending(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        for value in std::mem::take(&mut self.pending) {
            ctx.write_enumerated(value)?;
        }
        Ok(())
    }

    fn run(
        &mut self,
        ctx: &mut CommandContext<'_>,
        block: &ScriptBlock,
        item: Option<&Value>,
    ) -> Result<Value, CommandError> {
        ctx.scripts()
            .eval(block, &mut self.scope, item, ctx.adapter())
            .map_err(script_failed)
    }
}

impl Command for ForEachObject {
    fn name(&self) -> &str {
        "ForEach-Object"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        PARAMETERS
    }

    fn begin(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        self.member = ctx.parameters().get_str("MemberName").map(str::to_string);
        self.process = compile_parameter(ctx, "Process")?;
        self.end = compile_parameter(ctx, "End")?;
        if self.process.is_none() && self.member.is_none() {
            return Err(CommandError::terminating(
                ErrorRecord::new("ForEach-Object requires either Process or MemberName")
                    .with_category(ErrorCategory::InvalidArgument)
                    .with_id("MissingForEachBody"),
            ));
        }

        if let Some(block) = compile_parameter(ctx, "Begin")? {
            let result = self.run(ctx, &block, None)?;
            if !result.is_null() {
                self.pending.push(result);
            }
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        self.flush_pending(ctx)?;
        let input = input_object(ctx);

        if let Some(member) = &self.member {
            return match ctx.adapter().get_property(&input, member) {
                Some(value) => ctx.write_enumerated(value),
                None => Err(CommandError::non_terminating(
                    ErrorRecord::new(format!("Property '{}' not found", member))
                        .with_category(ErrorCategory::InvalidArgument)
                        .with_id("PropertyNotFound"),
                )),
            };
        }

        if let Some(block) = self.process.take() {
            let result = self.run(ctx, &block, Some(&input));
            self.process = Some(block);
            let value = result?;
            if !value.is_null() {
                ctx.write_enumerated(value)?;
            }
        }
        Ok(())
    }

    fn end(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        self.flush_pending(ctx)?;
        if let Some(block) = self.end.take() {
            let value = self.run(ctx, &block, None)?;
            if !value.is_null() {
                ctx.write_enumerated(value)?;
            }
        }
        Ok(())
    }
}
