//! Runtime settings applied to every chain
//!
//! These control how out-of-band records are treated, how per-object binding
//! errors affect the chain, and the limits placed on script blocks.
//!
//! # Main Types
//!
//! - [`PreferenceSettings`] - Per-stream action preferences
//! - [`BindingSettings`] - Treatment of pipeline binding errors
//! - [`ScriptSettings`] - Rhai engine limits
//! - [`LoggingSettings`] - Subscriber filter and optional log directory
//!
//! # Preferences
//!
//! Each stream has an [`ActionPreference`]:
//!
//! - **Continue**: the record is delivered to the host
//! - **SilentlyContinue**: the record is created but not delivered
//! - **Stop**: the record is delivered, then the writing command faults
//!
//! Error records are always delivered, so `SilentlyContinue` on the error
//! stream behaves as `Continue`.

use crate::pipeline::error::BindingError;
use crate::pipeline::parameter::BoundParameters;
use crate::pipeline::record::RecordKind;
use crate::types::ValueType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// What happens to a record written on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionPreference {
    Continue,
    SilentlyContinue,
    Stop,
}

impl ActionPreference {
    pub fn all() -> &'static [ActionPreference] {
        &[
            ActionPreference::Continue,
            ActionPreference::SilentlyContinue,
            ActionPreference::Stop,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPreference::Continue => "Continue",
            ActionPreference::SilentlyContinue => "SilentlyContinue",
            ActionPreference::Stop => "Stop",
        }
    }
}

impl fmt::Display for ActionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a valid action preference")]
pub struct ParsePreferenceError(pub String);

impl FromStr for ActionPreference {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionPreference::all()
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParsePreferenceError(s.to_string()))
    }
}

/// Per-stream preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceSettings {
    pub error_action: ActionPreference,
    pub warning: ActionPreference,
    pub verbose: ActionPreference,
    pub debug: ActionPreference,
    pub information: ActionPreference,
    pub progress: ActionPreference,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            error_action: ActionPreference::Continue,
            warning: ActionPreference::Continue,
            verbose: ActionPreference::SilentlyContinue,
            debug: ActionPreference::SilentlyContinue,
            information: ActionPreference::Continue,
            progress: ActionPreference::Continue,
        }
    }
}

impl PreferenceSettings {
    /// Preference governing `kind`. Objects always flow.
    pub fn for_kind(&self, kind: RecordKind) -> ActionPreference {
        match kind {
            RecordKind::Object => ActionPreference::Continue,
            RecordKind::Error => self.error_action,
            RecordKind::Warning => self.warning,
            RecordKind::Verbose => self.verbose,
            RecordKind::Debug => self.debug,
            RecordKind::Information => self.information,
            RecordKind::Progress => self.progress,
        }
    }

    /// Whether a record on `kind` reaches the host.
    pub fn delivers(&self, kind: RecordKind) -> bool {
        kind == RecordKind::Error || self.for_kind(kind) != ActionPreference::SilentlyContinue
    }

    /// Overlay the common parameters bound on one command.
    pub fn apply_common(&self, bound: &BoundParameters) -> Result<Self, BindingError> {
        let mut prefs = *self;
        let parse = |parameter: &'static str| -> Result<Option<ActionPreference>, BindingError> {
            let Some(value) = bound.get(parameter) else {
                return Ok(None);
            };
            let text = value.to_string();
            text.parse()
                .map(Some)
                .map_err(|_| BindingError::TypeConversionFailed {
                    parameter: parameter.to_string(),
                    value: text.clone(),
                    from: value.type_name().to_string(),
                    to: ValueType::String,
                })
        };

        if let Some(p) = parse("ErrorAction")? {
            prefs.error_action = p;
        }
        if let Some(p) = parse("WarningAction")? {
            prefs.warning = p;
        }
        if let Some(p) = parse("InformationAction")? {
            prefs.information = p;
        }
        if bound.switch("Verbose") {
            prefs.verbose = ActionPreference::Continue;
        }
        if bound.switch("Debug") {
            prefs.debug = ActionPreference::Continue;
        }
        Ok(prefs)
    }
}

/// How a binding error raised for one pipeline object affects the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BindingErrorAction {
    /// The command fails and the chain halts
    #[default]
    Terminating,
    /// The error is reported and the next object is processed
    NonTerminating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingSettings {
    pub pipeline_errors: BindingErrorAction,
}

/// Limits applied to the script engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Maximum operations per evaluation (0 = unlimited)
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Write a daily rolling log file here in addition to stderr
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,cmdpipe=debug".to_string(),
            directory: None,
        }
    }
}
