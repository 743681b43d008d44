//! Parameter binder.
//!
//! Two entry points:
//! - [`ParameterBinder::bind_named`] runs once per command before `Begin`,
//!   matching supplied arguments against the declared parameters.
//! - [`ParameterBinder::bind_pipeline_object`] runs before every `Process`
//!   call, layering values taken from the incoming object on top of the
//!   static set. Different objects may bind different parameters, so nothing
//!   from a previous object survives into the next.
//!
//! # Pipeline precedence
//!
//! By-value binding is attempted first: an exact match on a concrete type
//! wins over an `Any` parameter, which wins over a coercible one. Among
//! equals the earliest declared parameter wins. At
//! most one parameter is bound by value. By-property-name binding then fills
//! every remaining by-property-name parameter whose property exists.

use crate::adapter::{ConversionError, PropertyAdapter};
use crate::pipeline::error::BindingError;
use crate::pipeline::parameter::{
    BindingSource, BoundParameters, CommandArgument, ParameterMetadata, PipelineBinding,
    COMMON_PARAMETERS,
};
use crate::types::{Value, ValueType};

/// Binds arguments and pipeline objects against one command's metadata.
///
/// Holds no state of its own: identical inputs always produce identical results.
pub struct ParameterBinder<'a> {
    parameters: &'a [ParameterMetadata],
    adapter: &'a dyn PropertyAdapter,
}

impl<'a> ParameterBinder<'a> {
    pub fn new(parameters: &'a [ParameterMetadata], adapter: &'a dyn PropertyAdapter) -> Self {
        Self {
            parameters,
            adapter,
        }
    }

    /// True when any declared parameter takes pipeline input.
    pub fn accepts_pipeline_input(&self) -> bool {
        self.parameters.iter().any(|p| p.accepts_pipeline_input())
    }

    /// Static binding of supplied arguments.
    ///
    /// `expects_input` tells the binder that pipeline objects will follow, so
    /// mandatory parameters that can be filled from the pipeline are not yet
    /// required.
    pub fn bind_named(
        &self,
        arguments: &[CommandArgument],
        expects_input: bool,
    ) -> Result<BoundParameters, BindingError> {
        let mut bound = BoundParameters::new();
        let mut positional = Vec::new();

        for argument in arguments {
            match argument {
                CommandArgument::Named { name, value } => {
                    let param = self.resolve(name)?;
                    if bound.contains(param.name) {
                        return Err(BindingError::ParameterAlreadyBound {
                            parameter: param.name.to_string(),
                        });
                    }
                    let value = match value {
                        Some(value) => self.convert(param, value)?,
                        None if param.value_type == ValueType::Bool => Value::Bool(true),
                        None => {
                            return Err(BindingError::MissingArgument {
                                parameter: param.name.to_string(),
                            })
                        }
                    };
                    bound.insert(param.name, value, BindingSource::Named);
                }
                CommandArgument::Positional(value) => positional.push(value),
            }
        }

        let mut slots: Vec<&ParameterMetadata> = self
            .parameters
            .iter()
            .filter(|p| p.position.is_some() && !bound.contains(p.name))
            .collect();
        slots.sort_by_key(|p| p.position);

        let mut slots = slots.into_iter();
        for value in positional {
            let Some(param) = slots.next() else {
                return Err(BindingError::PositionalParameterNotFound {
                    argument: value.to_string(),
                });
            };
            let value = self.convert(param, value)?;
            bound.insert(param.name, value, BindingSource::Positional);
        }

        for param in self.parameters.iter().filter(|p| p.mandatory) {
            let deferred = expects_input && param.accepts_pipeline_input();
            if !deferred && !bound.contains(param.name) {
                return Err(BindingError::MissingMandatoryParameter {
                    parameter: param.name.to_string(),
                });
            }
        }

        Ok(bound)
    }

    /// Bind `input` on top of the static set `bound`.
    pub fn bind_pipeline_object(
        &self,
        bound: &BoundParameters,
        input: &Value,
    ) -> Result<BoundParameters, BindingError> {
        if !self.accepts_pipeline_input() {
            return Err(BindingError::NoParameterAcceptsInput);
        }

        let mut result = bound.clone();
        let mut bound_any = false;

        let by_value: Vec<&ParameterMetadata> = self
            .candidates(bound, PipelineBinding::ByValue)
            .collect();
        // A concrete type match outranks `Any`, which outranks a coercion.
        let exact = by_value
            .iter()
            .find(|p| p.value_type != ValueType::Any && input.is_exactly(p.value_type))
            .or_else(|| by_value.iter().find(|p| p.value_type == ValueType::Any));
        let chosen = match exact {
            Some(param) => Some((*param, input.clone())),
            None => by_value.iter().find_map(|param| {
                self.adapter
                    .convert_to(input, param.value_type)
                    .ok()
                    .map(|value| (*param, value))
            }),
        };
        if let Some((param, value)) = chosen {
            result.insert(param.name, value, BindingSource::PipelineByValue);
            bound_any = true;
        }

        for param in self.candidates(bound, PipelineBinding::ByPropertyName) {
            if result.contains(param.name) {
                continue;
            }
            let found = self.adapter.get_property(input, param.name).or_else(|| {
                param
                    .aliases
                    .iter()
                    .find_map(|alias| self.adapter.get_property(input, alias))
            });
            let Some(value) = found else {
                continue;
            };
            let value = if value.is_null() {
                value
            } else {
                self.convert(param, &value)?
            };
            result.insert(param.name, value, BindingSource::PipelineByPropertyName);
            bound_any = true;
        }

        if !bound_any {
            return Err(BindingError::NoParameterAcceptsInput);
        }

        if let Some(missing) = self
            .parameters
            .iter()
            .find(|p| p.mandatory && !result.contains(p.name))
        {
            return Err(BindingError::MissingMandatoryParameter {
                parameter: missing.name.to_string(),
            });
        }

        Ok(result)
    }

    fn candidates<'b>(
        &'b self,
        bound: &'b BoundParameters,
        mode: PipelineBinding,
    ) -> impl Iterator<Item = &'a ParameterMetadata> + 'b {
        self.parameters
            .iter()
            .filter(move |p| p.pipeline == mode && !bound.contains(p.name))
    }

    /// Resolve a supplied name: exact name or alias first, then a unique prefix.
    fn resolve(&self, name: &str) -> Result<&'a ParameterMetadata, BindingError> {
        let name = name.trim_start_matches('-');
        let all = || self.parameters.iter().chain(COMMON_PARAMETERS.iter());

        if let Some(param) = all().find(|p| p.is_named(name)) {
            return Ok(param);
        }

        let matches: Vec<&'a ParameterMetadata> = all().filter(|p| p.has_prefix(name)).collect();
        match matches.as_slice() {
            [] => Err(BindingError::ParameterNotFound {
                name: name.to_string(),
            }),
            [single] => Ok(*single),
            many => Err(BindingError::AmbiguousParameter {
                name: name.to_string(),
                candidates: many.iter().map(|p| p.name.to_string()).collect(),
            }),
        }
    }

    fn convert(&self, param: &ParameterMetadata, value: &Value) -> Result<Value, BindingError> {
        self.adapter
            .convert_to(value, param.value_type)
            .map_err(|ConversionError { value, from, to }| BindingError::TypeConversionFailed {
                parameter: param.name.to_string(),
                value,
                from,
                to,
            })
    }
}
