//! Adaptation capability: property lookup and type conversion across
//! heterogeneous object shapes.
//!
//! The binder never inspects objects directly. It asks a [`PropertyAdapter`]
//! for `GetProperty(object, name)` and `ConvertTo(value, type)`. Each backend
//! understands one object shape; [`CompositeAdapter`] chains them.
//!
//! | Backend          | Object shape                         |
//! |------------------|--------------------------------------|
//! | [`MapAdapter`]   | `Value::Object` property bags        |
//! | [`SchemaAdapter`]| `Value::Typed` rows + schema registry |
//! | [`NativeAdapter`]| `Value::Native` Rust objects         |

mod convert;
mod schema;

pub use convert::{convert_to, ConversionError};
pub use schema::{Schema, SchemaAdapter, SchemaRegistry};

use crate::types::{Value, ValueType};
use std::sync::Arc;

/// Property access and conversion over pipeline objects.
pub trait PropertyAdapter: Send + Sync {
    /// Look up `name` on `object`. `None` means the property does not exist
    /// (as opposed to existing with a null value).
    fn get_property(&self, object: &Value, name: &str) -> Option<Value>;

    /// Names of all properties of `object`, or `None` if this backend does
    /// not understand the object's shape.
    fn property_names(&self, object: &Value) -> Option<Vec<String>>;

    /// Coerce `value` to `target`.
    fn convert_to(&self, value: &Value, target: ValueType) -> Result<Value, ConversionError> {
        convert_to(value, target)
    }
}

/// Case-insensitive lookups on property bags.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAdapter;

impl PropertyAdapter for MapAdapter {
    fn get_property(&self, object: &Value, name: &str) -> Option<Value> {
        let Value::Object(bag) = object else {
            return None;
        };
        bag.get(name).cloned().or_else(|| {
            bag.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        })
    }

    fn property_names(&self, object: &Value) -> Option<Vec<String>> {
        match object {
            Value::Object(bag) => Some(bag.keys().cloned().collect()),
            _ => None,
        }
    }
}

/// Delegates to the object's own [`PropertySource`](crate::types::PropertySource).
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeAdapter;

impl PropertyAdapter for NativeAdapter {
    fn get_property(&self, object: &Value, name: &str) -> Option<Value> {
        let Value::Native(native) = object else {
            return None;
        };
        let source = native.source();
        source.property(name).or_else(|| {
            source
                .property_names()
                .into_iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(name))
                .and_then(|canonical| source.property(&canonical))
        })
    }

    fn property_names(&self, object: &Value) -> Option<Vec<String>> {
        match object {
            Value::Native(native) => Some(native.source().property_names()),
            _ => None,
        }
    }
}

/// Tries each backend in order; the first that answers wins.
#[derive(Clone, Default)]
pub struct CompositeAdapter {
    backends: Vec<Arc<dyn PropertyAdapter>>,
}

impl CompositeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map, schema (with `registry`) and native backends, in that order.
    pub fn with_schemas(registry: SchemaRegistry) -> Self {
        Self::new()
            .with_backend(MapAdapter)
            .with_backend(SchemaAdapter::new(registry))
            .with_backend(NativeAdapter)
    }

    pub fn with_backend(mut self, backend: impl PropertyAdapter + 'static) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl PropertyAdapter for CompositeAdapter {
    fn get_property(&self, object: &Value, name: &str) -> Option<Value> {
        self.backends
            .iter()
            .find_map(|backend| backend.get_property(object, name))
    }

    fn property_names(&self, object: &Value) -> Option<Vec<String>> {
        self.backends
            .iter()
            .find_map(|backend| backend.property_names(object))
    }
}

/// The adapter used when a pipeline is built without one.
pub fn default_adapter() -> Arc<dyn PropertyAdapter> {
    Arc::new(CompositeAdapter::with_schemas(SchemaRegistry::new()))
}
