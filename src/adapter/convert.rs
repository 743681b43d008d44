//! Value conversion (`ConvertTo`) used by the binder when a supplied value
//! does not already have the declared parameter type.

use crate::types::{Value, ValueType};
use thiserror::Error;

/// A value could not be coerced to the requested type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert value \"{value}\" of type {from} to {to}")]
pub struct ConversionError {
    pub value: String,
    pub from: String,
    pub to: ValueType,
}

impl ConversionError {
    fn new(value: &Value, to: ValueType) -> Self {
        Self {
            value: value.to_string(),
            from: value.type_name().to_string(),
            to,
        }
    }
}

/// Coerce `value` to `target`.
///
/// Exact matches are returned unchanged. Otherwise:
/// - `Int` accepts integral floats, numeric strings and booleans
/// - `Float` accepts ints and numeric strings
/// - `Bool` accepts numbers (non-zero is true) and `true`/`false` strings
/// - `String` accepts any scalar via its display form
/// - `Array` wraps any non-null scalar in a one-element array
/// - `Object` accepts only property-bearing values
pub fn convert_to(value: &Value, target: ValueType) -> Result<Value, ConversionError> {
    if value.is_exactly(target) {
        return Ok(value.clone());
    }

    let fail = || ConversionError::new(value, target);

    match (target, value) {
        (ValueType::Int, Value::Float(f)) => integral(*f).map(Value::Int).ok_or_else(fail),
        (ValueType::Int, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        (ValueType::Int, Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::Int(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(integral)
                .map(Value::Int)
                .ok_or_else(fail)
        }
        (ValueType::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        (ValueType::Float, Value::String(s)) => {
            s.trim().parse::<f64>().map(Value::Float).map_err(|_| fail())
        }
        (ValueType::Bool, Value::Int(i)) => Ok(Value::Bool(*i != 0)),
        (ValueType::Bool, Value::Float(f)) => Ok(Value::Bool(*f != 0.0)),
        (ValueType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "$true" => Ok(Value::Bool(true)),
            "false" | "$false" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        (ValueType::String, Value::Null) => Err(fail()),
        (ValueType::String, Value::Array(_)) => Err(fail()),
        (ValueType::String, other) => Ok(Value::String(other.to_string())),
        (ValueType::Array, Value::Null) => Err(fail()),
        (ValueType::Array, other) => Ok(Value::Array(vec![other.clone()])),
        _ => Err(fail()),
    }
}

/// `f` as an `i64` when it is whole and inside the `i64` range.
fn integral(f: f64) -> Option<i64> {
    // i64::MAX rounds up to 2^63 as a float, which is already out of range.
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_is_identity() {
        let v = Value::from("abc");
        assert_eq!(convert_to(&v, ValueType::String), Ok(v.clone()));
        assert_eq!(convert_to(&v, ValueType::Any), Ok(v));
    }

    #[test]
    fn test_numeric_conversions() {
        assert_eq!(convert_to(&Value::from(" 42 "), ValueType::Int), Ok(Value::Int(42)));
        assert_eq!(convert_to(&Value::Float(3.0), ValueType::Int), Ok(Value::Int(3)));
        assert!(convert_to(&Value::Float(3.5), ValueType::Int).is_err());
        assert_eq!(convert_to(&Value::Int(2), ValueType::Float), Ok(Value::Float(2.0)));
        assert!(convert_to(&Value::from("x"), ValueType::Float).is_err());
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(convert_to(&Value::Int(0), ValueType::Bool), Ok(Value::Bool(false)));
        assert_eq!(convert_to(&Value::from("TRUE"), ValueType::Bool), Ok(Value::Bool(true)));
        assert!(convert_to(&Value::from("yes"), ValueType::Bool).is_err());
    }

    #[test]
    fn test_wrapping_and_objects() {
        assert_eq!(
            convert_to(&Value::Int(1), ValueType::Array),
            Ok(Value::Array(vec![Value::Int(1)]))
        );
        let err = convert_to(&Value::Int(1), ValueType::Object).unwrap_err();
        assert_eq!(err.to, ValueType::Object);
        assert!(err.to_string().contains("int"));
        assert!(convert_to(&Value::Null, ValueType::String).is_err());
    }

    #[test]
    fn test_out_of_range_floats_do_not_convert_to_int() {
        assert!(convert_to(&Value::Float(1e30), ValueType::Int).is_err());
        assert!(convert_to(&Value::Float(-1e30), ValueType::Int).is_err());
        assert!(convert_to(&Value::Float(9.223372036854775807e18), ValueType::Int).is_err());
        assert!(convert_to(&Value::from("1e30"), ValueType::Int).is_err());
        assert_eq!(
            convert_to(&Value::Float(-9.223372036854775808e18), ValueType::Int),
            Ok(Value::Int(i64::MIN))
        );
        assert_eq!(convert_to(&Value::from("4e3"), ValueType::Int), Ok(Value::Int(4000)));
    }
}
