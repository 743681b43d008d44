//! Select-Object: projects properties and takes a window of the input.
//!
//! `-First N` stops upstream production once N objects have been written.

use super::{input_object, string_list};
use crate::adapter::PropertyAdapter;
use crate::pipeline::command::Command;
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::{CommandError, CommandResult};
use crate::pipeline::parameter::ParameterMetadata;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use crate::types::{PropertyBag, Value, ValueType};
use std::collections::VecDeque;

static PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("Property", ValueType::Array).position(0),
    ParameterMetadata::new("First", ValueType::Int),
    ParameterMetadata::new("Last", ValueType::Int),
    ParameterMetadata::new("Skip", ValueType::Int),
    ParameterMetadata::new("InputObject", ValueType::Any).by_value(),
];

#[derive(Debug, Default)]
pub struct SelectObject {
    properties: Vec<String>,
    first: Option<usize>,
    last: Option<usize>,
    skip: usize,
    seen: usize,
    written: usize,
    tail: VecDeque<Value>,
}

impl SelectObject {
    pub fn new() -> Self {
        Self::default()
    }

    fn project(&self, value: Value, adapter: &dyn PropertyAdapter) -> Value {
        if self.properties.is_empty() {
            return value;
        }
        let bag: PropertyBag = self
            .properties
            .iter()
            .map(|name| {
                let property = adapter.get_property(&value, name).unwrap_or_default();
                (name.clone(), property)
            })
            .collect();
        Value::Object(bag)
    }
}

fn count(ctx: &CommandContext<'_>, parameter: &str) -> Result<Option<usize>, CommandError> {
    let Some(n) = ctx.parameters().get_i64(parameter) else {
        return Ok(None);
    };
    usize::try_from(n).map(Some).map_err(|_| {
        CommandError::terminating(
            ErrorRecord::new(format!(
                "Cannot validate argument on parameter '{}': {} is less than 0",
                parameter, n
            ))
            .with_category(ErrorCategory::InvalidArgument)
            .with_id("NegativeCount"),
        )
    })
}

impl Command for SelectObject {
    fn name(&self) -> &str {
        "Select-Object"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        PARAMETERS
    }

    fn begin(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        self.properties = string_list(ctx, "Property");
        self.first = count(ctx, "First")?;
        self.last = count(ctx, "Last")?;
        self.skip = count(ctx, "Skip")?.unwrap_or(0);
        if self.first == Some(0) && self.last.is_none() {
            ctx.stop_upstream();
        }
        Ok(())
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let index = self.seen;
        self.seen += 1;
        if index < self.skip {
            return Ok(());
        }

        let value = self.project(input_object(ctx), ctx.adapter());

        if let Some(first) = self.first {
            if self.written < first {
                self.written += 1;
                ctx.write_object(value)?;
                if self.written == first && self.last.is_none() {
                    ctx.stop_upstream();
                }
                return Ok(());
            }
            if self.last.is_none() {
                ctx.stop_upstream();
                return Ok(());
            }
        }

        match self.last {
            Some(0) => Ok(()),
            Some(last) => {
                if self.tail.len() == last {
                    self.tail.pop_front();
                }
                self.tail.push_back(value);
                Ok(())
            }
            None => ctx.write_object(value),
        }
    }

    fn end(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        while let Some(value) = self.tail.pop_front() {
            ctx.write_object(value)?;
        }
        Ok(())
    }
}
