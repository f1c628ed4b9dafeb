//! Inspector launch configuration from JSON launch payloads and URL query strings.

use desktop_app_storage_inspector::InspectorOptions;
use platform_host::StorageAreaName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{model::SurfaceKind, HostShellError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Configuration accepted by [`crate::HostShell::open_inspector`].
pub struct InspectorConfig {
    /// Storage area to inspect (`local`, `session`, `sync`, or any host-specific name).
    pub storage_area: StorageAreaName,
    /// Surface to mount the inspector in.
    pub surface_kind: SurfaceKind,
    /// Immutable base filter.
    pub base_filter: Option<String>,
    /// Help text rendered in the inspector footer.
    pub footer_text: Option<String>,
}

impl InspectorConfig {
    /// Parses a JSON launch payload. `null` yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HostShellError::InvalidConfig`] when the payload does not describe a config.
    pub fn from_launch_params(params: &Value) -> Result<Self, HostShellError> {
        if params.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(params.clone())
            .map_err(|err| HostShellError::InvalidConfig(err.to_string()))
    }

    /// Returns the inspector options for this configuration.
    pub fn inspector_options(&self) -> InspectorOptions {
        InspectorOptions {
            area: self.storage_area.clone(),
            base_filter: self.base_filter.clone().unwrap_or_default(),
            footer_text: self.footer_text.clone(),
        }
    }
}

fn hex_digit(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).map(|digit| digit as u8)
}

fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'+' => decoded.push(b' '),
            b'%' if idx + 2 < bytes.len() => {
                match (hex_digit(bytes[idx + 1]), hex_digit(bytes[idx + 2])) {
                    (Some(high), Some(low)) => {
                        decoded.push(high << 4 | low);
                        idx += 3;
                        continue;
                    }
                    _ => decoded.push(b'%'),
                }
            }
            byte => decoded.push(byte),
        }
        idx += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Parses an inspector configuration from a URL query string.
///
/// Recognized keys: `area`, `surface`, `filter`, `footer`. Unknown keys and invalid surface
/// tokens are ignored; empty `filter`/`footer` values count as unset.
pub fn parse_inspector_config_from_query(query: &str) -> InspectorConfig {
    let mut config = InspectorConfig::default();
    for pair in query
        .trim_start_matches('?')
        .split('&')
        .filter(|part| !part.is_empty())
    {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_component(value);
        match key {
            "area" if !value.trim().is_empty() => {
                config.storage_area = StorageAreaName::new(value.trim());
            }
            "surface" => {
                if let Some(kind) = SurfaceKind::parse(&value) {
                    config.surface_kind = kind;
                }
            }
            "filter" => config.base_filter = Some(value).filter(|text| !text.is_empty()),
            "footer" => config.footer_text = Some(value).filter(|text| !text.is_empty()),
            _ => {}
        }
    }
    config
}

/// Returns the inspector configuration requested by the current page URL.
pub fn current_inspector_config() -> InspectorConfig {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window()
            .and_then(|window| window.location().search().ok())
            .map(|search| parse_inspector_config_from_query(&search))
            .unwrap_or_default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        InspectorConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn query_overrides_defaults() {
        let config = parse_inspector_config_from_query(
            "?area=session&surface=popup&filter=app.&footer=Edit+with+care%21",
        );
        assert_eq!(
            config,
            InspectorConfig {
                storage_area: StorageAreaName::session(),
                surface_kind: SurfaceKind::Popup,
                base_filter: Some("app.".into()),
                footer_text: Some("Edit with care!".into()),
            }
        );
    }

    #[test]
    fn query_ignores_unknown_keys_and_invalid_surfaces() {
        let config = parse_inspector_config_from_query("surface=window&theme=dark&filter=");
        assert_eq!(config, InspectorConfig::default());
    }

    #[test]
    fn malformed_escapes_are_kept_verbatim() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
        assert_eq!(decode_component("a%2Eb"), "a.b");
    }

    #[test]
    fn launch_params_use_snake_case_fields_and_kebab_case_kinds() {
        let config = InspectorConfig::from_launch_params(&json!({
            "storage_area": "sync",
            "surface_kind": "popup",
            "base_filter": "prefs."
        }))
        .expect("config");
        assert_eq!(config.storage_area.as_str(), "sync");
        assert_eq!(config.surface_kind, SurfaceKind::Popup);
        assert_eq!(config.base_filter.as_deref(), Some("prefs."));
        assert_eq!(config.footer_text, None);

        assert_eq!(
            InspectorConfig::from_launch_params(&Value::Null).expect("default"),
            InspectorConfig::default()
        );
        assert!(matches!(
            InspectorConfig::from_launch_params(&json!({"surface_kind": "window"})),
            Err(HostShellError::InvalidConfig(_))
        ));
    }

    #[test]
    fn options_default_missing_base_filter_to_empty() {
        let options = InspectorConfig::default().inspector_options();
        assert_eq!(options.base_filter, "");
        assert_eq!(options.area, StorageAreaName::local());
    }
}
