//! Pipeline definitions stored as files.
//!
//! A definition names each command with its arguments and optionally carries
//! the host input. TOML and JSON are accepted, chosen by file extension.
//!
//! ```toml
//! input = [3, 1, 2]
//!
//! [[commands]]
//! name = "Sort-Object"
//! switches = ["Descending"]
//!
//! [[commands]]
//! name = "Select-Object"
//! named = { First = 2 }
//! ```

use crate::config::BindingErrorAction;
use crate::error::{EngineError, Result, ResultExt};
use crate::pipeline::coordinator::{CommandSpec, PipelineBuilder};
use crate::pipeline::parameter::CommandArgument;
use crate::pipeline::registry::CommandRegistry;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One command of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positional: Vec<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub switches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_errors: Option<BindingErrorAction>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positional: Vec::new(),
            named: BTreeMap::new(),
            switches: Vec::new(),
            binding_errors: None,
        }
    }

    /// Arguments in the order the binder sees them: named, switches, positional.
    pub fn arguments(&self) -> Vec<CommandArgument> {
        let named = self
            .named
            .iter()
            .map(|(name, value)| CommandArgument::named(name.clone(), value.clone()));
        let switches = self.switches.iter().map(|s| CommandArgument::switch(s.clone()));
        let positional = self.positional.iter().cloned().map(CommandArgument::Positional);
        named.chain(switches).chain(positional).collect()
    }
}

/// A chain of commands plus optional host input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<Value>>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
}

impl PipelineDefinition {
    /// Load a `.toml` or `.json` definition.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(EngineError::from)
            .with_context(|| format!("Failed to read pipeline definition {:?}", path))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let definition = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        };
        definition.with_context(|| format!("Failed to parse pipeline definition {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| EngineError::Definition(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| EngineError::Definition(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// Resolve every command through `registry` and append it to `builder`.
    pub fn into_builder(
        &self,
        registry: &CommandRegistry,
        mut builder: PipelineBuilder,
    ) -> Result<PipelineBuilder> {
        if self.commands.is_empty() {
            return Err(EngineError::Definition(
                "Pipeline definition contains no commands".to_string(),
            ));
        }
        for definition in &self.commands {
            let command = registry.create(&definition.name)?;
            let mut spec = CommandSpec::new(command);
            spec.arguments = definition.arguments();
            spec.binding_errors = definition.binding_errors;
            builder = builder.command(spec);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORT_AND_TAKE: &str = r#"
        input = [3, 1, 2]

        [[commands]]
        name = "sort"
        switches = ["Descending"]

        [[commands]]
        name = "Select-Object"
        named = { First = 2 }
        binding_errors = "NonTerminating"
    "#;

    #[test]
    fn test_parse_toml() {
        let definition = PipelineDefinition::from_toml(SORT_AND_TAKE).unwrap();
        assert_eq!(
            definition.input,
            Some(vec![Value::Int(3), Value::Int(1), Value::Int(2)])
        );
        assert_eq!(definition.commands.len(), 2);
        assert_eq!(
            definition.commands[1].binding_errors,
            Some(BindingErrorAction::NonTerminating)
        );
        assert_eq!(
            definition.commands[1].arguments(),
            vec![CommandArgument::named("First", 2)]
        );
    }

    #[test]
    fn test_parse_json() {
        let definition = PipelineDefinition::from_json(
            r#"{"commands": [{"name": "Write-Output", "positional": [[1, "two"]]}]}"#,
        )
        .unwrap();
        assert_eq!(definition.input, None);
        assert_eq!(
            definition.commands[0].positional,
            vec![Value::Array(vec![Value::Int(1), Value::from("two")])]
        );
    }

    #[test]
    fn test_unknown_command() {
        let definition = PipelineDefinition {
            input: None,
            commands: vec![CommandDefinition::new("Get-Missing")],
        };
        let err = definition
            .into_builder(&CommandRegistry::new(), PipelineBuilder::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownCommand(_)));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("chain.toml");
        std::fs::write(&toml_path, SORT_AND_TAKE).unwrap();
        let from_toml = PipelineDefinition::load(&toml_path).unwrap();

        let json_path = dir.path().join("chain.JSON");
        std::fs::write(&json_path, serde_json::to_string(&from_toml).unwrap()).unwrap();
        assert_eq!(PipelineDefinition::load(&json_path).unwrap(), from_toml);

        assert!(PipelineDefinition::load(dir.path().join("missing.toml")).is_err());
    }
}
