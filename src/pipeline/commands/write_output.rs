//! Write-Output: emits its input objects, enumerating arrays.

use super::input_object;
use crate::pipeline::command::Command;
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::CommandResult;
use crate::pipeline::parameter::ParameterMetadata;
use crate::types::ValueType;

static PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("InputObject", ValueType::Any)
        .mandatory()
        .by_value()
        .position(0),
    ParameterMetadata::switch("NoEnumerate"),
];

#[derive(Debug, Default)]
pub struct WriteOutput;

impl WriteOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Command for WriteOutput {
    fn name(&self) -> &str {
        "Write-Output"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        PARAMETERS
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let value = input_object(ctx);
        if ctx.parameters().switch("NoEnumerate") {
            ctx.write_object(value)
        } else {
            ctx.write_enumerated(value)
        }
    }
}
