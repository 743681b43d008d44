//! Rhai script blocks for the filtering and projection commands
//!
//! `Where-Object` and `ForEach-Object` take their per-object logic as Rhai
//! source. The source is compiled once into a [`ScriptBlock`] when the command
//! begins and evaluated for every object.
//!
//! ## Variables
//!
//! - `item` - the current pipeline object (unit in begin/end blocks)
//!
//! Objects become Rhai maps, so properties read as `item.Name`. Typed rows
//! and native objects are flattened through the property adapter first.
//!
//! ## Functions
//!
//! - `like(text, pattern)` - case-insensitive wildcard match (`*`, `?`)
//!
//! ## Example Scripts
//!
//! Keep large files:
//! ```rhai
//! item.Length > 1024
//! ```
//!
//! Project a new object:
//! ```rhai
//! #{ Name: item.Name, Kb: item.Length / 1024 }
//! ```

mod engine;

pub use engine::ScriptEngine;

use crate::adapter::PropertyAdapter;
use crate::types::{PropertyBag, Value};
use rhai::{Dynamic, AST};

/// A compiled script
#[derive(Clone)]
pub struct ScriptBlock {
    ast: AST,
    source: String,
}

impl ScriptBlock {
    /// Get the source code of this block
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for ScriptBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptBlock")
            .field("source", &self.source)
            .finish()
    }
}

/// Convert a pipeline value into a Rhai value.
pub fn to_dynamic(value: &Value, adapter: &dyn PropertyAdapter) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from_bool(*b),
        Value::Int(i) => Dynamic::from_int(*i),
        Value::Float(f) => Dynamic::from_float(*f),
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => Dynamic::from_array(
            items
                .iter()
                .map(|item| to_dynamic(item, adapter))
                .collect(),
        ),
        Value::Object(bag) => Dynamic::from_map(
            bag.iter()
                .map(|(k, v)| (k.as_str().into(), to_dynamic(v, adapter)))
                .collect(),
        ),
        Value::Typed(_) | Value::Native(_) => {
            let names = adapter.property_names(value).unwrap_or_default();
            Dynamic::from_map(
                names
                    .into_iter()
                    .map(|name| {
                        let v = adapter
                            .get_property(value, &name)
                            .map(|v| to_dynamic(&v, adapter))
                            .unwrap_or(Dynamic::UNIT);
                        (name.as_str().into(), v)
                    })
                    .collect(),
            )
        }
    }
}

/// Convert a Rhai result back into a pipeline value.
pub fn from_dynamic(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::Int(i);
    }
    if let Ok(f) = value.as_float() {
        return Value::Float(f);
    }
    if value.is_string() {
        return Value::String(value.to_string());
    }
    if value.is_array() {
        return match value.into_array() {
            Ok(items) => Value::Array(items.into_iter().map(from_dynamic).collect()),
            Err(_) => Value::Null,
        };
    }
    if value.is_map() {
        return match value.try_cast::<rhai::Map>() {
            Some(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), from_dynamic(v)))
                    .collect::<PropertyBag>(),
            ),
            None => Value::Null,
        };
    }
    Value::String(value.to_string())
}
