//! Parameter metadata, supplied arguments and bound parameter sets.
//!
//! Each command declares its parameters via a static `ParameterMetadata`
//! array. The binder matches supplied [`CommandArgument`]s and pipeline
//! objects against it and produces [`BoundParameters`].

use crate::types::{Value, ValueType};

/// How a parameter takes values from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineBinding {
    /// Only from supplied arguments.
    #[default]
    None,
    /// The whole input object, when its type fits.
    ByValue,
    /// A same-named property of the input object.
    ByPropertyName,
}

/// Static descriptor of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterMetadata {
    pub name: &'static str,
    pub value_type: ValueType,
    pub mandatory: bool,
    pub pipeline: PipelineBinding,
    pub position: Option<usize>,
    pub aliases: &'static [&'static str],
}

impl ParameterMetadata {
    pub const fn new(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            mandatory: false,
            pipeline: PipelineBinding::None,
            position: None,
            aliases: &[],
        }
    }

    /// A `Bool` parameter that is `true` when named without a value.
    pub const fn switch(name: &'static str) -> Self {
        Self::new(name, ValueType::Bool)
    }

    pub const fn mandatory(self) -> Self {
        Self {
            mandatory: true,
            ..self
        }
    }

    pub const fn by_value(self) -> Self {
        Self {
            pipeline: PipelineBinding::ByValue,
            ..self
        }
    }

    pub const fn by_property_name(self) -> Self {
        Self {
            pipeline: PipelineBinding::ByPropertyName,
            ..self
        }
    }

    pub const fn position(self, position: usize) -> Self {
        Self {
            position: Some(position),
            ..self
        }
    }

    pub const fn aliases(self, aliases: &'static [&'static str]) -> Self {
        Self { aliases, ..self }
    }

    pub fn accepts_pipeline_input(&self) -> bool {
        self.pipeline != PipelineBinding::None
    }

    /// Case-insensitive match on the name or any alias.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive prefix match on the name or any alias.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        let starts = |candidate: &str| {
            candidate.len() >= prefix.len()
                && candidate.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        };
        starts(self.name) || self.aliases.iter().any(|a| starts(*a))
    }
}

/// Parameters every command accepts in addition to its own.
pub static COMMON_PARAMETERS: &[ParameterMetadata] = &[
    ParameterMetadata::new("ErrorAction", ValueType::String).aliases(&["ea"]),
    ParameterMetadata::new("WarningAction", ValueType::String).aliases(&["wa"]),
    ParameterMetadata::new("InformationAction", ValueType::String).aliases(&["infa"]),
    ParameterMetadata::switch("Verbose").aliases(&["vb"]),
    ParameterMetadata::switch("Debug").aliases(&["db"]),
];

/// An argument supplied by the caller when building the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArgument {
    /// `-Name value`, or `-Name` alone for a switch (`value: None`).
    Named { name: String, value: Option<Value> },
    Positional(Value),
}

impl CommandArgument {
    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        CommandArgument::Named {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn switch(name: impl Into<String>) -> Self {
        CommandArgument::Named {
            name: name.into(),
            value: None,
        }
    }

    pub fn positional(value: impl Into<Value>) -> Self {
        CommandArgument::Positional(value.into())
    }
}

/// Where a bound value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingSource {
    Named,
    Positional,
    PipelineByValue,
    PipelineByPropertyName,
}

impl BindingSource {
    pub fn is_pipeline(self) -> bool {
        matches!(
            self,
            BindingSource::PipelineByValue | BindingSource::PipelineByPropertyName
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    pub name: &'static str,
    pub value: Value,
    pub source: BindingSource,
}

/// The parameter values a command sees during one lifecycle call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundParameters {
    entries: Vec<BoundParameter>,
}

impl BoundParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier value.
    pub fn insert(&mut self, name: &'static str, value: Value, source: BindingSource) {
        self.entries.retain(|e| !e.name.eq_ignore_ascii_case(name));
        self.entries.push(BoundParameter {
            name,
            value,
            source,
        });
    }

    fn entry(&self, name: &str) -> Option<&BoundParameter> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entry(name).map(|e| &e.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn source(&self, name: &str) -> Option<BindingSource> {
        self.entry(name).map(|e| e.source)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// A switch is on when bound to a truthy value.
    pub fn switch(&self, name: &str) -> bool {
        self.get(name).map(Value::is_truthy).unwrap_or(false)
    }

    /// Names bound from the pipeline for the current object.
    pub fn pipeline_bound(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(|e| e.source.is_pipeline())
            .map(|e| e.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundParameter> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PARAMS: &[ParameterMetadata] = &[
        ParameterMetadata::new("Path", ValueType::String)
            .mandatory()
            .position(0)
            .aliases(&["PSPath"]),
        ParameterMetadata::new("InputObject", ValueType::Any).by_value(),
    ];

    #[test]
    fn test_const_builders() {
        assert!(PARAMS[0].mandatory);
        assert_eq!(PARAMS[0].position, Some(0));
        assert!(!PARAMS[0].accepts_pipeline_input());
        assert_eq!(PARAMS[1].pipeline, PipelineBinding::ByValue);
        assert!(PARAMS[1].accepts_pipeline_input());
    }

    #[test]
    fn test_name_matching() {
        assert!(PARAMS[0].is_named("path"));
        assert!(PARAMS[0].is_named("pspath"));
        assert!(PARAMS[0].has_prefix("Pa"));
        assert!(PARAMS[0].has_prefix("psp"));
        assert!(!PARAMS[0].has_prefix("Paths"));
    }

    #[test]
    fn test_bound_parameters() {
        let mut bound = BoundParameters::new();
        bound.insert("Path", "a".into(), BindingSource::Named);
        bound.insert("InputObject", 1.into(), BindingSource::PipelineByValue);
        bound.insert("path", "b".into(), BindingSource::Positional);

        assert_eq!(bound.len(), 2);
        assert_eq!(bound.get_str("PATH"), Some("b"));
        assert_eq!(bound.source("Path"), Some(BindingSource::Positional));
        assert_eq!(bound.pipeline_bound().collect::<Vec<_>>(), vec!["InputObject"]);
        assert!(!bound.switch("Verbose"));
    }
}
