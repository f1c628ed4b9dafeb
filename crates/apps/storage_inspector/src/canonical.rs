//! Canonical display/edit text for stored values and parsing of edited text back into values.

use platform_host::{StorageValue, StorageValueType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Reasons an edit buffer cannot be converted into a value for its row type.
pub enum EditParseError {
    /// Object rows require valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// Number rows require a finite numeric literal.
    #[error("`{0}` is not a finite number")]
    NotANumber(String),
    /// Boolean rows are changed through the toggle control.
    #[error("boolean values are toggled, not edited")]
    ToggleOnly,
}

/// Formats a number the way script engines print it.
///
/// Integral values carry no fraction. Magnitudes of at least `1e21` or below `1e-6` use exponent
/// form with an explicit exponent sign (`1e+21`, `1.5e-7`); everything else prints as a plain
/// decimal.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        // covers -0
        "0".to_string()
    } else if (1e-6..1e21).contains(&n.abs()) {
        n.to_string()
    } else {
        let exponent_form = format!("{n:e}");
        match exponent_form.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => exponent_form,
        }
    }
}

/// Returns the compact rendered form of a value.
pub fn display_text(value: &StorageValue) -> String {
    match value {
        StorageValue::Obj(json) => json.to_string(),
        StorageValue::Bool(flag) => flag.to_string(),
        StorageValue::Num(n) => format_number(*n),
        StorageValue::Str(text) => text.clone(),
    }
}

/// Returns the editable form of a value: pretty JSON for objects, the display form otherwise.
pub fn edit_text(value: &StorageValue) -> String {
    match value {
        StorageValue::Obj(json) => {
            serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
        }
        other => display_text(other),
    }
}

/// Parses an edit buffer into a value for a row of `value_type`.
///
/// # Errors
///
/// Returns [`EditParseError`] when the text does not convert for the row type.
pub fn parse_edit_text(
    value_type: StorageValueType,
    text: &str,
) -> Result<StorageValue, EditParseError> {
    match value_type {
        StorageValueType::Object => serde_json::from_str::<serde_json::Value>(text)
            .map(StorageValue::from)
            .map_err(|e| EditParseError::InvalidJson(e.to_string())),
        StorageValueType::Number => match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(StorageValue::Num(n)),
            _ => Err(EditParseError::NotANumber(text.to_string())),
        },
        StorageValueType::String => Ok(StorageValue::Str(text.to_string())),
        StorageValueType::Boolean => Err(EditParseError::ToggleOnly),
    }
}
