//! Where-Object: passes through the objects that satisfy a condition.
//!
//! The condition is either a script block (`item.Size > 10`) or a property
//! comparison (`-Property Size -Operator gt -Value 10`).

use super::{compile_parameter, input_object, script_failed};
use crate::pipeline::command::Command;
use crate::pipeline::context::CommandContext;
use crate::pipeline::error::{CommandError, CommandResult};
use crate::pipeline::parameter::ParameterMetadata;
use crate::pipeline::record::{ErrorCategory, ErrorRecord};
use crate::scripting::ScriptBlock;
use crate::types::{Value, ValueType};
use rhai::Scope;
use std::cmp::Ordering;
use std::str::FromStr;

static PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("FilterScript", ValueType::String).position(0),
    ParameterMetadata::new("Property", ValueType::String),
    ParameterMetadata::new("Value", ValueType::Any),
    ParameterMetadata::new("Operator", ValueType::String),
    ParameterMetadata::new("InputObject", ValueType::Any).by_value(),
];

/// Comparison used in property mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
}

impl ComparisonOperator {
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        let ordering = || left.compare(right);
        match self {
            ComparisonOperator::Eq => left.loose_eq(right),
            ComparisonOperator::Ne => !left.loose_eq(right),
            ComparisonOperator::Gt => ordering() == Some(Ordering::Greater),
            ComparisonOperator::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            ComparisonOperator::Lt => ordering() == Some(Ordering::Less),
            ComparisonOperator::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            ComparisonOperator::Like => left.like(&right.to_string()),
            ComparisonOperator::NotLike => !left.like(&right.to_string()),
        }
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('-').to_ascii_lowercase().as_str() {
            "eq" => Ok(ComparisonOperator::Eq),
            "ne" => Ok(ComparisonOperator::Ne),
            "gt" => Ok(ComparisonOperator::Gt),
            "ge" => Ok(ComparisonOperator::Ge),
            "lt" => Ok(ComparisonOperator::Lt),
            "le" => Ok(ComparisonOperator::Le),
            "like" => Ok(ComparisonOperator::Like),
            "notlike" => Ok(ComparisonOperator::NotLike),
            _ => Err(format!("Unknown comparison operator '{}'", s)),
        }
    }
}

#[derive(Debug)]
enum Condition {
    Script(ScriptBlock),
    Property {
        name: String,
        operator: ComparisonOperator,
        value: Value,
    },
}

#[derive(Debug, Default)]
pub struct WhereObject {
    condition: Option<Condition>,
    scope: Scope<'static>,
}

impl WhereObject {
    pub fn new() -> Self {
        Self::default()
    }
}

fn invalid_argument(message: impl Into<String>) -> CommandError {
    CommandError::terminating(
        ErrorRecord::new(message)
            .with_category(ErrorCategory::InvalidArgument)
            .with_id("InvalidWhereCondition"),
    )
}

impl Command for WhereObject {
    fn name(&self) -> &str {
        "Where-Object"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        PARAMETERS
    }

    fn begin(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        if let Some(block) = compile_parameter(ctx, "FilterScript")? {
            self.condition = Some(Condition::Script(block));
            return Ok(());
        }

        let Some(name) = ctx.parameters().get_str("Property") else {
            return Err(invalid_argument(
                "Where-Object requires either FilterScript or Property",
            ));
        };
        let operator = match ctx.parameters().get_str("Operator") {
            Some(op) => op.parse().map_err(invalid_argument)?,
            None => ComparisonOperator::Eq,
        };
        let value = ctx.parameter("Value").cloned().unwrap_or(Value::Bool(true));
        self.condition = Some(Condition::Property {
            name: name.to_string(),
            operator,
            value,
        });
        Ok(())
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let input = input_object(ctx);
        let keep = match &self.condition {
            Some(Condition::Script(block)) => ctx
                .scripts()
                .eval(block, &mut self.scope, Some(&input), ctx.adapter())
                .map_err(script_failed)?
                .is_truthy(),
            Some(Condition::Property {
                name,
                operator,
                value,
            }) => {
                let actual = ctx.adapter().get_property(&input, name).unwrap_or_default();
                operator.evaluate(&actual, value)
            }
            None => false,
        };
        if keep {
            ctx.write_object(input)?;
        }
        Ok(())
    }
}
