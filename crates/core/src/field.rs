//! Typed field accessor table.
//!
//! Each entity type declares a static slice of [`FieldDef`]s mapping a column
//! name to its [`ColumnKind`] and a getter/setter pair exchanging
//! [`FieldValue`]s. All name-based attribute access in the crate goes through
//! this table.

use serde_json::Value;

use crate::error::CoreError;
use crate::time::{format_timestamp, parse_timestamp};
use crate::types::Timestamp;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
    DateTime,
    Json,
}

impl ColumnKind {
    /// PostgreSQL type name used when casting bound text to this column.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Boolean => "BOOLEAN",
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Float => "DOUBLE PRECISION",
            ColumnKind::Text => "TEXT",
            ColumnKind::DateTime => "TIMESTAMP",
            ColumnKind::Json => "JSONB",
        }
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(Timestamp),
    Json(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Render as JSON for serialized output.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::DateTime(ts) => Value::String(format_timestamp(ts)),
            FieldValue::Json(v) => v.clone(),
        }
    }

    /// Coerce an incoming JSON value to the given column kind.
    ///
    /// `field` is only used in error messages. JSON `null` always maps to
    /// [`FieldValue::Null`]; nullability is enforced by the setter.
    pub fn coerce(field: &str, kind: ColumnKind, raw: &Value) -> Result<Self, CoreError> {
        if raw.is_null() {
            return Ok(FieldValue::Null);
        }
        let mismatch = || {
            CoreError::Validation(format!(
                "Field {field} expects a {} value, got {raw}",
                kind.sql_type().to_lowercase()
            ))
        };
        match kind {
            ColumnKind::Boolean => match raw {
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                Value::String(s) if s == "true" => Ok(FieldValue::Bool(true)),
                Value::String(s) if s == "false" => Ok(FieldValue::Bool(false)),
                _ => Err(mismatch()),
            },
            ColumnKind::Integer => match raw {
                Value::Number(n) => n.as_i64().map(FieldValue::Int).ok_or_else(mismatch),
                Value::String(s) => s.trim().parse().map(FieldValue::Int).map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            ColumnKind::Float => match raw {
                Value::Number(n) => n.as_f64().map(FieldValue::Float).ok_or_else(mismatch),
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(FieldValue::Float)
                    .map_err(|_| mismatch()),
                _ => Err(mismatch()),
            },
            ColumnKind::Text => match raw {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                _ => Err(mismatch()),
            },
            ColumnKind::DateTime => match raw {
                Value::String(s) => parse_timestamp(s)
                    .map(FieldValue::DateTime)
                    .ok_or_else(mismatch),
                _ => Err(mismatch()),
            },
            ColumnKind::Json => Ok(FieldValue::Json(raw.clone())),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Timestamp> for FieldValue {
    fn from(v: Timestamp) -> Self {
        FieldValue::DateTime(v)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        if v.is_null() {
            FieldValue::Null
        } else {
            FieldValue::Json(v)
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// Conversion back from a [`FieldValue`] inside setters.
///
/// The `Option` impls accept `Null`; the plain impls reject it.
pub trait FromFieldValue: Sized {
    fn from_field_value(field: &str, value: FieldValue) -> Result<Self, CoreError>;
}

fn type_error(field: &str, expected: &str, value: &FieldValue) -> CoreError {
    CoreError::Validation(format!("Field {field} expects {expected}, got {value:?}"))
}

macro_rules! impl_from_field_value {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl FromFieldValue for $ty {
            fn from_field_value(field: &str, value: FieldValue) -> Result<Self, CoreError> {
                match value {
                    FieldValue::$variant(v) => Ok(v),
                    other => Err(type_error(field, $expected, &other)),
                }
            }
        }
    };
}

impl_from_field_value!(bool, Bool, "a boolean");
impl_from_field_value!(i64, Int, "an integer");
impl_from_field_value!(f64, Float, "a number");
impl_from_field_value!(String, Text, "a string");
impl_from_field_value!(Timestamp, DateTime, "a timestamp");
impl_from_field_value!(Value, Json, "a JSON value");

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(field: &str, value: FieldValue) -> Result<Self, CoreError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(field, other).map(Some),
        }
    }
}

/// One entry of an entity's accessor table.
pub struct FieldDef<E: 'static> {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub get: fn(&E) -> FieldValue,
    pub set: fn(&mut E, FieldValue) -> Result<(), CoreError>,
}

impl<E: 'static> FieldDef<E> {
    pub const fn new(
        name: &'static str,
        kind: ColumnKind,
        get: fn(&E) -> FieldValue,
        set: fn(&mut E, FieldValue) -> Result<(), CoreError>,
    ) -> Self {
        Self {
            name,
            kind,
            get,
            set,
        }
    }
}

/// Declare a [`FieldDef`] for a plain struct field.
///
/// ```ignore
/// field!(User, name: Text),
/// field!(User, last_login: DateTime),
/// ```
#[macro_export]
macro_rules! field {
    ($entity:ty, $name:ident : $kind:ident) => {
        $crate::field::FieldDef::<$entity>::new(
            stringify!($name),
            $crate::field::ColumnKind::$kind,
            |e: &$entity| $crate::field::FieldValue::from(e.$name.clone()),
            |e: &mut $entity, v: $crate::field::FieldValue| {
                e.$name = $crate::field::FromFieldValue::from_field_value(stringify!($name), v)?;
                Ok(())
            },
        )
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn null_coerces_to_null_for_every_kind() {
        for kind in [
            ColumnKind::Boolean,
            ColumnKind::Integer,
            ColumnKind::Text,
            ColumnKind::DateTime,
        ] {
            assert_eq!(
                FieldValue::coerce("f", kind, &Value::Null).unwrap(),
                FieldValue::Null
            );
        }
    }

    #[test]
    fn boolean_accepts_json_bool_and_literal_strings() {
        let c = |v| FieldValue::coerce("f", ColumnKind::Boolean, &v);
        assert_eq!(c(json!(true)).unwrap(), FieldValue::Bool(true));
        assert_eq!(c(json!("false")).unwrap(), FieldValue::Bool(false));
        assert_matches!(c(json!("yes")), Err(CoreError::Validation(_)));
    }

    #[test]
    fn integer_accepts_numbers_and_numeric_strings() {
        let c = |v| FieldValue::coerce("age", ColumnKind::Integer, &v);
        assert_eq!(c(json!(42)).unwrap(), FieldValue::Int(42));
        assert_eq!(c(json!(" 7 ")).unwrap(), FieldValue::Int(7));
        assert_matches!(c(json!(1.5)), Err(CoreError::Validation(_)));
        assert_matches!(c(json!("abc")), Err(CoreError::Validation(msg)) if msg.contains("age"));
    }

    #[test]
    fn text_rejects_non_strings() {
        assert_matches!(
            FieldValue::coerce("name", ColumnKind::Text, &json!(3)),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn datetime_parses_strings() {
        let v = FieldValue::coerce("when", ColumnKind::DateTime, &json!("2024-03-01 10:00:00"))
            .unwrap();
        assert_matches!(v, FieldValue::DateTime(_));
        assert_eq!(v.to_json(), json!("2024-03-01T10:00:00"));
    }

    #[test]
    fn json_passes_through() {
        let raw = json!({"a": [1, 2]});
        assert_eq!(
            FieldValue::coerce("meta", ColumnKind::Json, &raw).unwrap(),
            FieldValue::Json(raw)
        );
    }

    #[test]
    fn option_setter_conversion_accepts_null() {
        let v: Option<String> = FromFieldValue::from_field_value("x", FieldValue::Null).unwrap();
        assert_eq!(v, None);
        let err = <String as FromFieldValue>::from_field_value("x", FieldValue::Null);
        assert_matches!(err, Err(CoreError::Validation(_)));
    }
}
