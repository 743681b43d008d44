//! Rhai Script Engine Implementation
//!
//! Compiles and evaluates [`ScriptBlock`]s with the limits from
//! [`ScriptSettings`].

use crate::adapter::PropertyAdapter;
use crate::config::ScriptSettings;
use crate::error::{EngineError, Result, ResultExt};
use crate::scripting::{from_dynamic, to_dynamic, ScriptBlock};
use crate::types::{wildcard_match, Value};
use rhai::{Dynamic, Engine, Scope};

/// The engine shared by every script block of a chain
pub struct ScriptEngine {
    engine: Engine,
    settings: ScriptSettings,
}

impl ScriptEngine {
    /// Create a new script engine with default limits
    pub fn new() -> Self {
        Self::with_settings(ScriptSettings::default())
    }

    pub fn with_settings(settings: ScriptSettings) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, &settings);
        Self { engine, settings }
    }

    /// Configure the Rhai engine with built-in functions and safety limits
    fn configure_engine(engine: &mut Engine, settings: &ScriptSettings) {
        engine.set_max_expr_depths(settings.max_expr_depth, settings.max_expr_depth);
        engine.set_max_call_levels(settings.max_call_levels);
        engine.set_max_operations(settings.max_operations);
        engine.set_max_string_size(settings.max_string_size);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(1_000);

        engine.register_fn("like", |text: &str, pattern: &str| {
            wildcard_match(pattern, text)
        });
    }

    /// Compile `source` into a reusable block
    pub fn compile(&self, source: &str) -> Result<ScriptBlock> {
        let ast = self.engine.compile(source)?;
        Ok(ScriptBlock {
            ast,
            source: source.to_string(),
        })
    }

    /// Evaluate `block` in `scope`, with `item` bound to the current object.
    ///
    /// Variables declared by earlier evaluations in the same scope stay
    /// visible, so a begin block can initialise state for the process block.
    pub fn eval(
        &self,
        block: &ScriptBlock,
        scope: &mut Scope<'static>,
        item: Option<&Value>,
        adapter: &dyn PropertyAdapter,
    ) -> Result<Value> {
        let item = item
            .map(|v| to_dynamic(v, adapter))
            .unwrap_or(Dynamic::UNIT);
        scope.set_value("item", item);

        self.engine
            .eval_ast_with_scope::<Dynamic>(scope, block.ast())
            .with_context(|| format!("Script '{}' failed", block.source()))
            .map(from_dynamic)
    }

    /// Validate a script without executing it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| EngineError::Script(format!("Validation error: {}", e)))
    }

    pub fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    /// Get a reference to the underlying Rhai engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("settings", &self.settings)
            .finish()
    }
}
