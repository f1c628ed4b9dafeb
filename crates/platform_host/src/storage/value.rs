//! Tagged stored-value model shared by key-value stores and their consumers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest integral magnitude that survives an `f64` round trip without loss.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
/// One stored value. Stores carry no schema, so a key may hold any variant at any time.
pub enum StorageValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Num(f64),
    /// Plain text.
    Str(String),
    /// Structured value (arrays, objects, and `null`).
    Obj(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Discriminant of a [`StorageValue`].
pub enum StorageValueType {
    /// [`StorageValue::Bool`].
    Boolean,
    /// [`StorageValue::Num`].
    Number,
    /// [`StorageValue::Str`].
    String,
    /// [`StorageValue::Obj`].
    Object,
}

impl StorageValueType {
    /// Returns a stable lowercase token for diagnostics and markup attributes.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for StorageValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StorageValue {
    /// Returns the discriminant for this value.
    ///
    /// Structured values are classified first so that composite payloads never fall through to a
    /// scalar branch.
    pub fn value_type(&self) -> StorageValueType {
        match self {
            Self::Obj(_) => StorageValueType::Object,
            Self::Bool(_) => StorageValueType::Boolean,
            Self::Num(_) => StorageValueType::Number,
            Self::Str(_) => StorageValueType::String,
        }
    }

    /// Returns the boolean payload when this is a [`StorageValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl From<Value> for StorageValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(number) => match number.as_f64() {
                Some(n) => Self::Num(n),
                None => Self::Obj(Value::Number(number)),
            },
            Value::String(text) => Self::Str(text),
            other => Self::Obj(other),
        }
    }
}

impl From<StorageValue> for Value {
    fn from(value: StorageValue) -> Self {
        match value {
            StorageValue::Bool(flag) => Value::Bool(flag),
            StorageValue::Num(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                Value::from(n as i64)
            }
            StorageValue::Num(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            StorageValue::Str(text) => Value::String(text),
            StorageValue::Obj(value) => value,
        }
    }
}

impl From<bool> for StorageValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for StorageValue {
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

impl From<&str> for StorageValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for StorageValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One key/value pair of a storage area.
pub struct StorageEntry {
    /// Entry key, unique within its area.
    pub key: String,
    /// Stored value.
    pub value: StorageValue,
}

impl StorageEntry {
    /// Creates an entry from any value convertible into [`StorageValue`].
    pub fn new(key: impl Into<String>, value: impl Into<StorageValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
