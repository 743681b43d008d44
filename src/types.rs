//! Core value types carried through the pipeline
//!
//! Commands exchange strongly-typed objects, not text. This module defines the
//! value model that flows through pipes and into parameter binding.
//!
//! # Main Types
//!
//! - [`Value`] - A pipeline object (scalar, array, property bag, typed row or native object)
//! - [`ValueType`] - Declared type of a command parameter
//! - [`TypedObject`] - A positional row whose field names live in a schema registry
//! - [`NativeObject`] - A Rust object exposing its own properties through [`PropertySource`]
//!
//! # Comparison Semantics
//!
//! Comparisons follow shell conventions rather than Rust's structural equality:
//! numbers compare across `Int`/`Float`, strings compare case-insensitively, and
//! a string on the left converts the right-hand side to text before comparing.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Named properties of an ad-hoc object. Keys keep their original casing;
/// lookups through the adaptation layer are case-insensitive.
pub type PropertyBag = BTreeMap<String, Value>;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ValueType {
    /// Accepts any value without conversion.
    #[default]
    Any,
    Bool,
    Int,
    Float,
    String,
    Array,
    /// Any property-bearing object (bag, typed row or native object).
    Object,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compact row of field values. Field names are resolved by the schema
/// backend of the adaptation layer, keyed by `type_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedObject {
    pub type_name: String,
    pub fields: Vec<Value>,
}

impl TypedObject {
    pub fn new(type_name: impl Into<String>, fields: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }
}

/// Implemented by Rust types that want to travel through a pipeline as
/// objects with named properties.
pub trait PropertySource: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str;

    fn property_names(&self) -> Vec<String>;

    fn property(&self, name: &str) -> Option<Value>;
}

/// Shared handle to a [`PropertySource`]. Equality is identity.
#[derive(Clone)]
pub struct NativeObject(Arc<dyn PropertySource>);

impl NativeObject {
    pub fn new(source: impl PropertySource + 'static) -> Self {
        Self(Arc::new(source))
    }

    pub fn source(&self) -> &dyn PropertySource {
        self.0.as_ref()
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0.as_ref(), f)
    }
}

impl PartialEq for NativeObject {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl Serialize for NativeObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.0.property_names();
        let mut map = serializer.serialize_map(Some(names.len()))?;
        for name in &names {
            let value = self.0.property(name).unwrap_or(Value::Null);
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// A pipeline object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(PropertyBag),
    #[serde(skip_deserializing)]
    Typed(TypedObject),
    #[serde(skip_deserializing)]
    Native(NativeObject),
}

impl Value {
    /// Build a property bag from `(name, value)` pairs.
    pub fn object<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The runtime type of this value. `Null` has no type.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::String(_) => Some(ValueType::String),
            Value::Array(_) => Some(ValueType::Array),
            Value::Object(_) | Value::Typed(_) | Value::Native(_) => Some(ValueType::Object),
        }
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Typed(t) => &t.type_name,
            Value::Native(n) => n.source().type_name(),
            other => other.value_type().map(|t| t.name()).unwrap_or("null"),
        }
    }

    /// True when this value satisfies `target` without any conversion.
    pub fn is_exactly(&self, target: ValueType) -> bool {
        target == ValueType::Any || self.value_type() == Some(target)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Shell truthiness: null, false, zero, empty strings and empty arrays are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => match items.as_slice() {
                [] => false,
                [single] => single.is_truthy(),
                _ => true,
            },
            Value::Object(_) | Value::Typed(_) | Value::Native(_) => true,
        }
    }

    /// Loose equality used by filters: numeric across int/float, strings
    /// case-insensitive, and a string on the left compares against the
    /// textual form of the right.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), b) => a.eq_ignore_ascii_case(&b.to_string()),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a, Value::String(b.to_string())) {
                    (Value::Int(_) | Value::Float(_), Value::String(s)) => s
                        .trim()
                        .parse::<f64>()
                        .map(|y| a.as_f64() == Some(y))
                        .unwrap_or(false),
                    _ => a == b,
                },
            },
        }
    }

    /// Ordering used by sorting and relational filters. Returns `None` when
    /// the two values have no meaningful order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), b) => {
                let b = b.to_string();
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                (Some(x), None) => b
                    .as_str()
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .and_then(|y| x.partial_cmp(&y)),
                _ => None,
            },
        }
    }

    /// Case-insensitive wildcard match of the textual form against `pattern`.
    pub fn like(&self, pattern: &str) -> bool {
        wildcard_match(pattern, &self.to_string())
    }
}

/// `*` matches any run, `?` any single character. Case-insensitive.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Object(bag) => {
                f.write_str("@{")?;
                for (i, (k, v)) in bag.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Typed(t) => f.write_str(&t.type_name),
            Value::Native(n) => f.write_str(n.source().type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<PropertyBag> for Value {
    fn from(v: PropertyBag) -> Self {
        Value::Object(v)
    }
}

impl From<TypedObject> for Value {
    fn from(v: TypedObject) -> Self {
        Value::Typed(v)
    }
}

impl From<NativeObject> for Value {
    fn from(v: NativeObject) -> Self {
        Value::Native(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Process {
        name: &'static str,
        id: i64,
    }

    impl PropertySource for Process {
        fn type_name(&self) -> &str {
            "Process"
        }

        fn property_names(&self) -> Vec<String> {
            vec!["Name".into(), "Id".into()]
        }

        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "Name" => Some(self.name.into()),
                "Id" => Some(self.id.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_value_type() {
        assert_eq!(Value::Int(1).value_type(), Some(ValueType::Int));
        assert_eq!(Value::Null.value_type(), None);
        assert_eq!(
            Value::object([("a", 1)]).value_type(),
            Some(ValueType::Object)
        );
        assert!(Value::from("x").is_exactly(ValueType::Any));
        assert!(!Value::from("x").is_exactly(ValueType::Int));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Array(vec![Value::Bool(false)]).is_truthy());
        assert!(Value::Array(vec![Value::Int(0), Value::Int(0)]).is_truthy());
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
        assert!(Value::from("ABC").loose_eq(&Value::from("abc")));
        assert!(Value::from("2").loose_eq(&Value::Int(2)));
        assert!(Value::Int(2).loose_eq(&Value::from("2")));
        assert!(!Value::Int(2).loose_eq(&Value::from("two")));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(
            Value::from("b").compare(&Value::from("A")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.compare(&Value::Int(0)), Some(Ordering::Less));
        assert_eq!(Value::Bool(true).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::from("x")]).to_string(),
            "1 x"
        );
        assert_eq!(Value::object([("a", 1), ("b", 2)]).to_string(), "@{a=1; b=2}");
    }

    #[test]
    fn test_native_object_identity_and_json() {
        let a = NativeObject::new(Process { name: "init", id: 1 });
        let b = a.clone();
        let c = NativeObject::new(Process { name: "init", id: 1 });
        assert_eq!(a, b);
        assert_ne!(a, c);

        let json = serde_json::to_value(Value::Native(a)).unwrap();
        assert_eq!(json["Name"], "init");
        assert_eq!(json["Id"], 1);
    }

    #[test]
    fn test_deserialize_untagged() {
        let v: Value = serde_json::from_str(r#"[1, 2.5, "x", null, {"k": true}]"#).unwrap();
        let items = v.as_array().unwrap();
        assert_eq!(items[0], Value::Int(1));
        assert_eq!(items[1], Value::Float(2.5));
        assert_eq!(items[2], Value::from("x"));
        assert!(items[3].is_null());
        assert_eq!(items[4], Value::object([("k", true)]));
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("a*", "Apple"));
        assert!(wildcard_match("*.txt", "notes.TXT"));
        assert!(wildcard_match("b?d", "bad"));
        assert!(wildcard_match("*a*b*", "xaxxbx"));
        assert!(!wildcard_match("b?d", "bead"));
        assert!(!wildcard_match("a*", "banana"));
        assert!(Value::Int(123).like("1*3"));
    }
}
