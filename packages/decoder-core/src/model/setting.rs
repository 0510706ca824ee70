//! Loosely-typed setting values.
//!
//! Settings are stored as bare JSON scalars. Reads are strict: a value stored
//! as an integer does not read back as a float or a string.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A scalar setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    Text(String),
}

impl SettingValue {
    /// Name of the stored variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::Float(_) => "float",
            SettingValue::Text(_) => "string",
        }
    }

    /// Fails for floats JSON has no encoding for (NaN and the infinities)
    pub fn ensure_encodable(&self, key: &str) -> Result<()> {
        match self {
            SettingValue::Float(v) if !v.is_finite() => Err(Error::Serialization(format!(
                "Setting '{}' is {}, which cannot be stored",
                key, v
            ))),
            _ => Ok(()),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v.into())
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Float(v)
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Text(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_string())
    }
}

/// Typed extraction from a [`SettingValue`]
pub trait FromSettingValue: Sized {
    /// Type name used in `TypeMismatch` errors
    const TYPE_NAME: &'static str;

    /// Returns `None` if the variant does not match
    fn from_setting(value: SettingValue) -> Option<Self>;

    /// Convert, reporting a `TypeMismatch` against `key`
    fn try_from_setting(key: &str, value: SettingValue) -> Result<Self> {
        let found = value.type_name();
        Self::from_setting(value).ok_or_else(|| Error::TypeMismatch {
            key: key.to_string(),
            expected: Self::TYPE_NAME,
            found,
        })
    }
}

impl FromSettingValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_setting(value: SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl FromSettingValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_setting(value: SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl FromSettingValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_setting(value: SettingValue) -> Option<Self> {
        match value {
            SettingValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl FromSettingValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_setting(value: SettingValue) -> Option<Self> {
        match value {
            SettingValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl FromSettingValue for SettingValue {
    const TYPE_NAME: &'static str = "any";

    fn from_setting(value: SettingValue) -> Option<Self> {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_round_trip_through_json() {
        for value in [
            SettingValue::Bool(true),
            SettingValue::Int(42),
            SettingValue::Float(0.75),
            SettingValue::Text("dark".into()),
        ] {
            let raw = serde_json::to_string(&value).unwrap();
            let back: SettingValue = serde_json::from_str(&raw).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_whole_float_stays_float() {
        let raw = serde_json::to_string(&SettingValue::Float(1.0)).unwrap();
        let back: SettingValue = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, SettingValue::Float(1.0));
    }

    #[test]
    fn test_non_finite_floats_are_not_encodable() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                SettingValue::Float(v).ensure_encodable("ratio"),
                Err(Error::Serialization(_))
            ));
        }
        assert!(SettingValue::Float(0.5).ensure_encodable("ratio").is_ok());
        assert!(SettingValue::Text("x".into()).ensure_encodable("name").is_ok());
    }

    #[test]
    fn test_strict_conversion() {
        assert_eq!(bool::from_setting(SettingValue::Bool(true)), Some(true));
        assert_eq!(bool::from_setting(SettingValue::Int(1)), None);
        assert_eq!(f64::from_setting(SettingValue::Int(1)), None);

        let err = String::try_from_setting("font_size", SettingValue::Int(14)).unwrap_err();
        match err {
            Error::TypeMismatch { key, expected, found } => {
                assert_eq!(key, "font_size");
                assert_eq!(expected, "string");
                assert_eq!(found, "int");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
