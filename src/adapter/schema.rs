//! Schema-based backend: `TypedObject` rows store only field values, the
//! field names come from a registry keyed by type name.

use super::PropertyAdapter;
use crate::types::Value;
use std::collections::HashMap;

/// Field layout of a typed row.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub type_name: String,
    pub fields: Vec<String>,
}

impl Schema {
    pub fn new<S: Into<String>>(type_name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Index of `name`, matched case-insensitively.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.eq_ignore_ascii_case(name))
    }
}

/// Type name → schema. Type names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a schema.
    pub fn register(&mut self, schema: Schema) {
        self.schemas
            .insert(schema.type_name.to_ascii_lowercase(), schema);
    }

    pub fn get(&self, type_name: &str) -> Option<&Schema> {
        self.schemas.get(&type_name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Resolves `TypedObject` fields through a [`SchemaRegistry`].
#[derive(Debug, Clone, Default)]
pub struct SchemaAdapter {
    registry: SchemaRegistry,
}

impl SchemaAdapter {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}

impl PropertyAdapter for SchemaAdapter {
    fn get_property(&self, object: &Value, name: &str) -> Option<Value> {
        let Value::Typed(row) = object else {
            return None;
        };
        let schema = self.registry.get(&row.type_name)?;
        let index = schema.field_index(name)?;
        // Rows shorter than their schema expose the missing fields as null.
        Some(row.fields.get(index).cloned().unwrap_or(Value::Null))
    }

    fn property_names(&self, object: &Value) -> Option<Vec<String>> {
        let Value::Typed(row) = object else {
            return None;
        };
        self.registry
            .get(&row.type_name)
            .map(|schema| schema.fields.clone())
    }
}
