//! Sort-Object: buffers all input and writes it back in order during `end`.

use super::{input_object, string_list};
use crate::adapter::PropertyAdapter;
use crate::pipeline::command::Command;
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::CommandResult;
use crate::pipeline::parameter::ParameterMetadata;
use crate::types::{Value, ValueType};
use std::cmp::Ordering;

static PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("Property", ValueType::Array).position(0),
    ParameterMetadata::switch("Descending"),
    ParameterMetadata::switch("Unique"),
    ParameterMetadata::new("InputObject", ValueType::Any).by_value(),
];

#[derive(Debug, Default)]
pub struct SortObject {
    buffer: Vec<Value>,
}

impl SortObject {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_key(value: &Value, properties: &[String], adapter: &dyn PropertyAdapter) -> Vec<Value> {
    if properties.is_empty() {
        return vec![value.clone()];
    }
    properties
        .iter()
        .map(|name| adapter.get_property(value, name).unwrap_or_default())
        .collect()
}

/// Unordered pairs compare equal so the sort stays stable.
fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.compare(y).unwrap_or(Ordering::Equal))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Command for SortObject {
    fn name(&self) -> &str {
        "Sort-Object"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        PARAMETERS
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        self.buffer.push(input_object(ctx));
        Ok(())
    }

    fn end(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let properties = string_list(ctx, "Property");
        let descending = ctx.parameters().switch("Descending");
        let unique = ctx.parameters().switch("Unique");

        let mut keyed: Vec<(Vec<Value>, Value)> = std::mem::take(&mut self.buffer)
            .into_iter()
            .map(|v| (sort_key(&v, &properties, ctx.adapter()), v))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = compare_keys(a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        if unique {
            keyed.dedup_by(|(a, _), (b, _)| {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            });
        }

        tracing::trace!(count = keyed.len(), "Sorted buffered input");
        for (_, value) in keyed {
            ctx.write_object(value)?;
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), crate::pipeline::error::CommandFault> {
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_keys_falls_through_to_next_key() {
        let a = vec![Value::from("x"), Value::Int(2)];
        let b = vec![Value::from("X"), Value::Int(1)];
        assert_eq!(compare_keys(&a, &b), Ordering::Greater);
        assert_eq!(compare_keys(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_unordered_values_compare_equal() {
        let a = vec![Value::Bool(true)];
        let b = vec![Value::Int(3)];
        assert_eq!(compare_keys(&a, &b), Ordering::Equal);
    }
}
