//! Display-surface model: surfaces hosting inspectors and their stacking/focus state.

use serde::{Deserialize, Serialize};

use crate::config::InspectorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Identifier of one display surface.
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Kind of display surface an inspector is mounted in.
pub enum SurfaceKind {
    /// Full page tab. Any number of tabs may be open.
    #[default]
    Tab,
    /// Transient popup. At most one popup is open; opening another replaces it.
    Popup,
}

impl SurfaceKind {
    /// Stable token used in URLs and launch payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::Popup => "popup",
        }
    }

    /// Parses a surface token.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "tab" => Some(Self::Tab),
            "popup" => Some(Self::Popup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One open display surface.
pub struct SurfaceRecord {
    /// Surface id.
    pub id: SurfaceId,
    /// Surface kind.
    pub kind: SurfaceKind,
    /// Title shown in the tab strip or popup header.
    pub title: String,
    /// Configuration the hosted inspector was opened with.
    pub config: InspectorConfig,
    /// Whether this surface has focus.
    pub is_focused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// All open surfaces in opening order.
pub struct SurfacesState {
    /// Next id handed out by the reducer.
    pub next_surface_id: u64,
    /// Open surfaces.
    pub surfaces: Vec<SurfaceRecord>,
}

impl Default for SurfacesState {
    fn default() -> Self {
        Self {
            next_surface_id: 1,
            surfaces: Vec::new(),
        }
    }
}

impl SurfacesState {
    /// Returns the focused surface id.
    pub fn focused_surface_id(&self) -> Option<SurfaceId> {
        self.surfaces
            .iter()
            .find(|surface| surface.is_focused)
            .map(|surface| surface.id)
    }

    /// Returns the record for `surface_id`.
    pub fn surface(&self, surface_id: SurfaceId) -> Option<&SurfaceRecord> {
        self.surfaces
            .iter()
            .find(|surface| surface.id == surface_id)
    }

    /// Returns the open popup, if any.
    pub fn popup(&self) -> Option<&SurfaceRecord> {
        self.surfaces
            .iter()
            .find(|surface| surface.kind == SurfaceKind::Popup)
    }

    /// Iterates open tabs in opening order.
    pub fn tabs(&self) -> impl Iterator<Item = &SurfaceRecord> + '_ {
        self.surfaces
            .iter()
            .filter(|surface| surface.kind == SurfaceKind::Tab)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Request to open a surface hosting an inspector.
pub struct OpenSurfaceRequest {
    /// Inspector configuration; its `surface_kind` selects the surface kind.
    pub config: InspectorConfig,
    /// Optional title override.
    pub title: Option<String>,
}

impl OpenSurfaceRequest {
    /// Creates a request with the default title.
    pub fn new(config: InspectorConfig) -> Self {
        Self {
            config,
            title: None,
        }
    }

    /// Returns the title used when no override is given.
    pub fn default_title(config: &InspectorConfig) -> String {
        match config.base_filter.as_deref() {
            Some(filter) if !filter.is_empty() => {
                format!("Storage: {} ({filter})", config.storage_area)
            }
            _ => format!("Storage: {}", config.storage_area),
        }
    }
}

#[cfg(test)]
mod tests {
    use platform_host::StorageAreaName;

    use super::*;

    #[test]
    fn surface_kind_tokens_round_trip() {
        for kind in [SurfaceKind::Tab, SurfaceKind::Popup] {
            assert_eq!(SurfaceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SurfaceKind::parse("window"), None);
        assert_eq!(
            serde_json::to_string(&SurfaceKind::Popup).expect("serialize"),
            "\"popup\""
        );
    }

    #[test]
    fn default_title_mentions_area_and_base_filter() {
        let mut config = InspectorConfig::default();
        assert_eq!(OpenSurfaceRequest::default_title(&config), "Storage: local");
        config.storage_area = StorageAreaName::session();
        config.base_filter = Some("app.".into());
        assert_eq!(
            OpenSurfaceRequest::default_title(&config),
            "Storage: session (app.)"
        );
    }
}
