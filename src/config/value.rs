use num_bigint::BigInt;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use thiserror::Error;
use toml::Value;

/// Error raised when a raw configuration value cannot be coerced to the
/// requested scalar type. Carries no path context; the binding layer adds it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValueError {
    #[error("cannot read {found} value as {expected}")]
    WrongKind {
        found: &'static str,
        expected: &'static str,
    },

    #[error("'{raw}' is not a valid {expected}")]
    Invalid { raw: String, expected: &'static str },

    #[error("{raw} is out of range for {expected}")]
    OutOfRange { raw: String, expected: &'static str },
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

fn integer_in_range<T: TryFrom<i64>>(
    value: &Value,
    expected: &'static str,
) -> Result<T, ValueError> {
    match value {
        Value::Integer(i) => T::try_from(*i).map_err(|_| ValueError::OutOfRange {
            raw: i.to_string(),
            expected,
        }),
        Value::String(s) => {
            let wide: i64 = s.trim().parse().map_err(|_| ValueError::Invalid {
                raw: s.clone(),
                expected,
            })?;
            T::try_from(wide).map_err(|_| ValueError::OutOfRange {
                raw: s.clone(),
                expected,
            })
        }
        other => Err(ValueError::WrongKind {
            found: kind(other),
            expected,
        }),
    }
}

pub(crate) fn coerce_i64(value: &Value) -> Result<i64, ValueError> {
    integer_in_range(value, "integer")
}

pub(crate) fn coerce_i32(value: &Value) -> Result<i32, ValueError> {
    integer_in_range(value, "32-bit integer")
}

pub(crate) fn coerce_i16(value: &Value) -> Result<i16, ValueError> {
    integer_in_range(value, "16-bit integer")
}

pub(crate) fn coerce_byte(value: &Value) -> Result<u8, ValueError> {
    integer_in_range(value, "byte")
}

pub(crate) fn coerce_bool(value: &Value) -> Result<bool, ValueError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Value::String(s) => Err(ValueError::Invalid {
            raw: s.clone(),
            expected: "boolean",
        }),
        other => Err(ValueError::WrongKind {
            found: kind(other),
            expected: "boolean",
        }),
    }
}

fn float(value: &Value, expected: &'static str) -> Result<f64, ValueError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        Value::String(s) => s.trim().parse().map_err(|_| ValueError::Invalid {
            raw: s.clone(),
            expected,
        }),
        other => Err(ValueError::WrongKind {
            found: kind(other),
            expected,
        }),
    }
}

pub(crate) fn coerce_f64(value: &Value) -> Result<f64, ValueError> {
    float(value, "float")
}

pub(crate) fn coerce_f32(value: &Value) -> Result<f32, ValueError> {
    float(value, "float").map(|f| f as f32)
}

pub(crate) fn coerce_big_integer(value: &Value) -> Result<BigInt, ValueError> {
    match value {
        Value::Integer(i) => Ok(BigInt::from(*i)),
        Value::String(s) => s.trim().parse().map_err(|_| ValueError::Invalid {
            raw: s.clone(),
            expected: "big integer",
        }),
        other => Err(ValueError::WrongKind {
            found: kind(other),
            expected: "big integer",
        }),
    }
}

pub(crate) fn coerce_decimal(value: &Value) -> Result<Decimal, ValueError> {
    match value {
        Value::Integer(i) => Ok(Decimal::from(*i)),
        Value::Float(f) => Decimal::from_f64(*f).ok_or_else(|| ValueError::Invalid {
            raw: f.to_string(),
            expected: "decimal",
        }),
        Value::String(s) => s.trim().parse().map_err(|_| ValueError::Invalid {
            raw: s.clone(),
            expected: "decimal",
        }),
        other => Err(ValueError::WrongKind {
            found: kind(other),
            expected: "decimal",
        }),
    }
}

/// Scalars coerce to their display form; arrays and tables do not.
pub(crate) fn coerce_string(value: &Value) -> Result<String, ValueError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Datetime(dt) => Ok(dt.to_string()),
        other => Err(ValueError::WrongKind {
            found: kind(other),
            expected: "string",
        }),
    }
}

/// An array coerces element-wise; a single scalar becomes a one-element array.
pub(crate) fn coerce_string_array(value: &Value) -> Result<Vec<String>, ValueError> {
    match value {
        Value::Array(items) => items.iter().map(coerce_string).collect(),
        other => coerce_string(other).map(|s| vec![s]),
    }
}

pub(crate) fn coerce_list(value: &Value) -> Result<Vec<Value>, ValueError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        other => Ok(vec![other.clone()]),
    }
}
