//! Command lookup by name or alias.
//!
//! Built-in commands are known through [`CommandType`]; hosts add their own
//! commands with [`CommandRegistry::register`]. Lookups are case-insensitive.

use crate::error::{EngineError, Result};
use crate::pipeline::command::{AnyCommand, BuiltinCommand, Command};
use crate::pipeline::commands::{
    ForEachObject, MeasureObject, SelectObject, SortObject, WhereObject, WriteOutput,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The built-in commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    WriteOutput,
    WhereObject,
    ForEachObject,
    SelectObject,
    SortObject,
    MeasureObject,
}

impl CommandType {
    pub fn display_name(&self) -> &'static str {
        match self {
            CommandType::WriteOutput => "Write-Output",
            CommandType::WhereObject => "Where-Object",
            CommandType::ForEachObject => "ForEach-Object",
            CommandType::SelectObject => "Select-Object",
            CommandType::SortObject => "Sort-Object",
            CommandType::MeasureObject => "Measure-Object",
        }
    }

    /// Short names accepted in addition to the display name.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CommandType::WriteOutput => &["echo", "write"],
            CommandType::WhereObject => &["where", "?"],
            CommandType::ForEachObject => &["foreach", "%"],
            CommandType::SelectObject => &["select"],
            CommandType::SortObject => &["sort"],
            CommandType::MeasureObject => &["measure"],
        }
    }

    pub fn all() -> &'static [CommandType] {
        &[
            CommandType::WriteOutput,
            CommandType::WhereObject,
            CommandType::ForEachObject,
            CommandType::SelectObject,
            CommandType::SortObject,
            CommandType::MeasureObject,
        ]
    }

    /// A fresh instance. Every chain gets its own.
    pub fn create(&self) -> BuiltinCommand {
        match self {
            CommandType::WriteOutput => BuiltinCommand::WriteOutput(WriteOutput::new()),
            CommandType::WhereObject => BuiltinCommand::WhereObject(WhereObject::new()),
            CommandType::ForEachObject => BuiltinCommand::ForEachObject(ForEachObject::new()),
            CommandType::SelectObject => BuiltinCommand::SelectObject(SelectObject::new()),
            CommandType::SortObject => BuiltinCommand::SortObject(SortObject::new()),
            CommandType::MeasureObject => BuiltinCommand::MeasureObject(MeasureObject::new()),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.display_name().eq_ignore_ascii_case(name)
            || self.aliases().iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

type CommandFactory = Box<dyn Fn() -> Box<dyn Command> + Send + Sync>;

/// Name table used to turn definitions into command instances.
pub struct CommandRegistry {
    /// Keyed by lowercased name.
    plugins: BTreeMap<String, (String, CommandFactory)>,
}

impl CommandRegistry {
    /// A registry with only the built-in commands.
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Register a host command. A later registration under the same name
    /// replaces the earlier one; built-in names cannot be shadowed.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Command> + Send + Sync + 'static,
    {
        let name = name.into();
        if let Some(builtin) = Self::builtin(&name) {
            return Err(EngineError::Definition(format!(
                "'{}' is reserved by the built-in command {}",
                name, builtin
            )));
        }
        tracing::debug!(command = %name, "Registered command");
        self.plugins
            .insert(name.to_ascii_lowercase(), (name, Box::new(factory)));
        Ok(())
    }

    pub fn builtin(name: &str) -> Option<CommandType> {
        CommandType::all().iter().copied().find(|t| t.matches(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        Self::builtin(name).is_some() || self.plugins.contains_key(&name.to_ascii_lowercase())
    }

    /// Instantiate the command registered under `name`.
    pub fn create(&self, name: &str) -> Result<AnyCommand> {
        if let Some(builtin) = Self::builtin(name) {
            return Ok(AnyCommand::Builtin(builtin.create()));
        }
        self.plugins
            .get(&name.to_ascii_lowercase())
            .map(|(_, factory)| AnyCommand::Plugin(factory()))
            .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))
    }

    /// Display names of every known command, built-ins first.
    pub fn names(&self) -> Vec<&str> {
        CommandType::all()
            .iter()
            .map(|t| -> &str { t.display_name() })
            .chain(self.plugins.values().map(|(name, _)| name.as_str()))
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
