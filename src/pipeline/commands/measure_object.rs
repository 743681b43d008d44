//! Measure-Object: counts the input and computes numeric statistics.
//!
//! Writes a single summary object from `end` with the properties `Count`,
//! `Sum`, `Average`, `Maximum`, `Minimum` and `Property`. Statistics that were
//! not requested are null.

use super::input_object;
use crate::pipeline::command::Command;
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::{CommandError, CommandResult};
use crate::pipeline::parameter::ParameterMetadata;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use crate::types::{Value, ValueType};

static PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("Property", ValueType::String).position(0),
    ParameterMetadata::switch("Sum"),
    ParameterMetadata::switch("Average"),
    ParameterMetadata::switch("Maximum"),
    ParameterMetadata::switch("Minimum"),
    ParameterMetadata::new("InputObject", ValueType::Any).by_value(),
];

#[derive(Debug, Default)]
pub struct MeasureObject {
    count: i64,
    numeric: i64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl MeasureObject {
    pub fn new() -> Self {
        Self::default()
    }

    fn wants_statistics(ctx: &CommandContext<'_>) -> bool {
        ["Sum", "Average", "Maximum", "Minimum"]
            .iter()
            .any(|s| ctx.parameters().switch(s))
    }

    fn record(&mut self, number: f64) {
        self.numeric += 1;
        self.sum += number;
        self.min = Some(self.min.map_or(number, |m| m.min(number)));
        self.max = Some(self.max.map_or(number, |m| m.max(number)));
    }
}

impl Command for MeasureObject {
    fn name(&self) -> &str {
        "Measure-Object"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        PARAMETERS
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let input = input_object(ctx);
        let property = ctx.parameters().get_str("Property");

        let value = match property {
            Some(name) => match ctx.adapter().get_property(&input, name) {
                Some(value) => value,
                None => {
                    return Err(CommandError::non_terminating(
                        ErrorRecord::new(format!(
                            "Property '{}' cannot be found on the input object",
                            name
                        ))
                        .with_category(ErrorCategory::InvalidArgument)
                        .with_id("PropertyNotFound"),
                    ))
                }
            },
            None => input,
        };
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;

        if Self::wants_statistics(ctx) {
            let number = ctx
                .adapter()
                .convert_to(&value, ValueType::Float)
                .ok()
                .and_then(|v| v.as_f64());
            match number {
                Some(n) => self.record(n),
                None => {
                    return Err(CommandError::non_terminating(
                        ErrorRecord::new(format!("Input \"{}\" is not numeric", value))
                            .with_category(ErrorCategory::InvalidType)
                            .with_id("NonNumericInput"),
                    ))
                }
            }
        }
        Ok(())
    }

    fn end(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let params = ctx.parameters();
        let stat = |requested: bool, value: Option<f64>| -> Value {
            if requested {
                value.into()
            } else {
                Value::Null
            }
        };
        let average = (self.numeric > 0).then(|| self.sum / self.numeric as f64);
        let sum = (self.numeric > 0).then_some(self.sum);

        let summary = Value::object([
            ("Count", Value::Int(self.count)),
            ("Sum", stat(params.switch("Sum"), sum)),
            ("Average", stat(params.switch("Average"), average)),
            ("Maximum", stat(params.switch("Maximum"), self.max)),
            ("Minimum", stat(params.switch("Minimum"), self.min)),
            ("Property", params.get_str("Property").into()),
        ]);
        ctx.write_object(summary)
    }
}
