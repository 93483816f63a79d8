//! Argument and return value conversion.
//!
//! Which source types may be converted to which declared types is an explicit
//! table ([`ConversionPolicy::allows`]). Whether a particular *value* fits is
//! checked separately by [`convert`], so a narrowing conversion that would lose
//! information fails instead of truncating.

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when a value cannot be converted to a declared type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("{from} is not convertible to {to}")]
    NotConvertible { from: ValueType, to: ValueType },

    #[error("value {value} does not fit in {to}")]
    OutOfRange { value: String, to: ValueType },

    #[error("value {value} cannot be represented exactly as {to}")]
    Inexact { value: String, to: ValueType },

    #[error("bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Which implicit conversions the registry applies when argument types differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPolicy {
    /// Only values whose runtime type equals the declared type are accepted.
    Exact,
    /// Numeric, character and string conversions from the table below.
    ///
    /// | from            | to                    |
    /// |-----------------|-----------------------|
    /// | integer         | integer, float, char  |
    /// | float           | float, integer        |
    /// | char            | integer, string       |
    /// | string          | bytes                 |
    /// | bytes           | string                |
    #[default]
    Lenient,
}

impl ConversionPolicy {
    /// Check whether `from` may be converted to `to` under this policy.
    pub fn allows(self, from: ValueType, to: ValueType) -> bool {
        if from == to {
            return true;
        }
        match self {
            ConversionPolicy::Exact => false,
            ConversionPolicy::Lenient => {
                (from.is_integer() && (to.is_integer() || to.is_float() || to == ValueType::Char))
                    || (from.is_float() && (to.is_float() || to.is_integer()))
                    || (from == ValueType::Char
                        && (to.is_integer() || to == ValueType::String))
                    || matches!(
                        (from, to),
                        (ValueType::String, ValueType::Bytes) | (ValueType::Bytes, ValueType::String)
                    )
            }
        }
    }
}

/// Convert `value` to `target` under `policy`.
///
/// Values already of the target type are returned unchanged.
pub fn convert(
    value: Value,
    target: ValueType,
    policy: ConversionPolicy,
) -> Result<Value, ConversionError> {
    let from = value.value_type();
    if from == target {
        return Ok(value);
    }
    if !policy.allows(from, target) {
        return Err(ConversionError::NotConvertible { from, to: target });
    }

    if let Some(n) = value.as_i128() {
        return if target.is_float() {
            let converted = float_value(n as f64, target);
            match converted.as_f64() {
                Some(f) if f as i128 == n => Ok(converted),
                _ => Err(inexact(&value, target)),
            }
        } else if target == ValueType::Char {
            u32::try_from(n)
                .ok()
                .and_then(char::from_u32)
                .map(Value::Char)
                .ok_or_else(|| out_of_range(&value, target))
        } else {
            integer_value(n, target).ok_or_else(|| out_of_range(&value, target))
        };
    }

    if let Some(f) = value.as_f64() {
        return if target.is_float() {
            if f.is_finite() && target == ValueType::F32 && f.abs() > f64::from(f32::MAX) {
                Err(out_of_range(&value, target))
            } else if f.is_finite() && target == ValueType::F32 && f64::from(f as f32) != f {
                Err(inexact(&value, target))
            } else {
                Ok(float_value(f, target))
            }
        } else if !f.is_finite() || f.fract() != 0.0 {
            Err(inexact(&value, target))
        } else if f < i128::MIN as f64 || f > i128::MAX as f64 {
            Err(out_of_range(&value, target))
        } else {
            integer_value(f as i128, target).ok_or_else(|| out_of_range(&value, target))
        };
    }

    match value {
        Value::Char(c) if target == ValueType::String => Ok(Value::Str(c.to_string())),
        Value::Char(c) => {
            integer_value(i128::from(u32::from(c)), target).ok_or_else(|| ConversionError::OutOfRange {
                value: format!("{:?}", c),
                to: target,
            })
        }
        Value::Str(s) => Ok(Value::Bytes(s.into_bytes())),
        Value::Bytes(b) => String::from_utf8(b)
            .map(Value::Str)
            .map_err(|_| ConversionError::InvalidUtf8),
        other => Err(ConversionError::NotConvertible {
            from: other.value_type(),
            to: target,
        }),
    }
}

fn out_of_range(value: &Value, to: ValueType) -> ConversionError {
    ConversionError::OutOfRange {
        value: value.to_string(),
        to,
    }
}

fn inexact(value: &Value, to: ValueType) -> ConversionError {
    ConversionError::Inexact {
        value: value.to_string(),
        to,
    }
}

fn integer_value(n: i128, target: ValueType) -> Option<Value> {
    match target {
        ValueType::I8 => i8::try_from(n).ok().map(Value::I8),
        ValueType::I16 => i16::try_from(n).ok().map(Value::I16),
        ValueType::I32 => i32::try_from(n).ok().map(Value::I32),
        ValueType::I64 => i64::try_from(n).ok().map(Value::I64),
        ValueType::U8 => u8::try_from(n).ok().map(Value::U8),
        ValueType::U16 => u16::try_from(n).ok().map(Value::U16),
        ValueType::U32 => u32::try_from(n).ok().map(Value::U32),
        ValueType::U64 => u64::try_from(n).ok().map(Value::U64),
        _ => None,
    }
}

fn float_value(f: f64, target: ValueType) -> Value {
    if target == ValueType::F32 {
        Value::F32(f as f32)
    } else {
        Value::F64(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient(value: impl Into<Value>, target: ValueType) -> Result<Value, ConversionError> {
        convert(value.into(), target, ConversionPolicy::Lenient)
    }

    #[test]
    fn test_identical_types_always_pass() {
        assert_eq!(
            convert(Value::Bool(true), ValueType::Bool, ConversionPolicy::Exact),
            Ok(Value::Bool(true))
        );
        assert!(ConversionPolicy::Exact.allows(ValueType::Bytes, ValueType::Bytes));
    }

    #[test]
    fn test_exact_policy_rejects_widening() {
        assert_eq!(
            convert(Value::I32(1), ValueType::I64, ConversionPolicy::Exact),
            Err(ConversionError::NotConvertible {
                from: ValueType::I32,
                to: ValueType::I64
            })
        );
    }

    #[test]
    fn test_integer_widening_and_checked_narrowing() {
        assert_eq!(lenient(7i32, ValueType::I64), Ok(Value::I64(7)));
        assert_eq!(lenient(200i64, ValueType::U8), Ok(Value::U8(200)));
        assert!(matches!(
            lenient(300i64, ValueType::U8),
            Err(ConversionError::OutOfRange { to: ValueType::U8, .. })
        ));
        assert!(matches!(
            lenient(-1i32, ValueType::U64),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert_eq!(lenient(u64::MAX, ValueType::U64), Ok(Value::U64(u64::MAX)));
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(lenient(3i32, ValueType::F64), Ok(Value::F64(3.0)));
        assert_eq!(lenient(2.0f64, ValueType::I16), Ok(Value::I16(2)));
        assert!(matches!(
            lenient(2.5f64, ValueType::I32),
            Err(ConversionError::Inexact { .. })
        ));
        assert!(matches!(
            lenient(f64::NAN, ValueType::I32),
            Err(ConversionError::Inexact { .. })
        ));
        assert_eq!(lenient(1.5f32, ValueType::F64), Ok(Value::F64(1.5)));
        assert!(matches!(
            lenient(1e300f64, ValueType::F32),
            Err(ConversionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_lossy_float_conversions_are_inexact() {
        assert!(matches!(
            lenient((1i64 << 53) + 1, ValueType::F64),
            Err(ConversionError::Inexact { to: ValueType::F64, .. })
        ));
        assert_eq!(lenient(1i64 << 53, ValueType::F64), Ok(Value::F64(9007199254740992.0)));
        assert!(matches!(
            lenient(u64::MAX, ValueType::F32),
            Err(ConversionError::Inexact { to: ValueType::F32, .. })
        ));
        assert!(matches!(
            lenient(u64::MAX, ValueType::F64),
            Err(ConversionError::Inexact { .. })
        ));
        assert_eq!(lenient(16_777_216u32, ValueType::F32), Ok(Value::F32(16_777_216.0)));
        assert!(matches!(
            lenient(0.1f64, ValueType::F32),
            Err(ConversionError::Inexact { to: ValueType::F32, .. })
        ));
        assert_eq!(lenient(0.25f64, ValueType::F32), Ok(Value::F32(0.25)));
        assert!(matches!(
            lenient(f64::INFINITY, ValueType::F32),
            Ok(Value::F32(f)) if f.is_infinite()
        ));
    }

    #[test]
    fn test_bool_converts_only_to_bool() {
        for target in [ValueType::I32, ValueType::F64, ValueType::String] {
            assert!(!ConversionPolicy::Lenient.allows(ValueType::Bool, target));
        }
        assert!(!ConversionPolicy::Lenient.allows(ValueType::I32, ValueType::Bool));
        assert_eq!(
            lenient(12i32, ValueType::Bool),
            Err(ConversionError::NotConvertible {
                from: ValueType::I32,
                to: ValueType::Bool
            })
        );
    }

    #[test]
    fn test_char_and_string_conversions() {
        assert_eq!(lenient('A', ValueType::U32), Ok(Value::U32(65)));
        assert_eq!(lenient(97u8, ValueType::Char), Ok(Value::Char('a')));
        assert!(matches!(
            lenient(0xD800u32, ValueType::Char),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert_eq!(lenient('x', ValueType::String), Ok(Value::Str("x".into())));
        assert!(matches!(
            lenient('€', ValueType::U8),
            Err(ConversionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_string_bytes_round_trip() {
        assert_eq!(
            lenient("hi", ValueType::Bytes),
            Ok(Value::Bytes(b"hi".to_vec()))
        );
        assert_eq!(
            lenient(b"ok".to_vec(), ValueType::String),
            Ok(Value::Str("ok".into()))
        );
        assert_eq!(
            lenient(vec![0xffu8, 0xfe], ValueType::String),
            Err(ConversionError::InvalidUtf8)
        );
    }

    #[test]
    fn test_string_does_not_parse_numbers() {
        assert!(!ConversionPolicy::Lenient.allows(ValueType::String, ValueType::I64));
        assert!(!ConversionPolicy::Lenient.allows(ValueType::F64, ValueType::String));
    }
}
