//! Shared host-bundle and capability models for browser and stub runtime composition.

use std::rc::Rc;

use crate::{KeyValueStore, StorageAreaName};

/// Stable host strategy selected for the current build/runtime composition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStrategy {
    /// Browser-backed runtime composition.
    Browser,
    /// Composition with in-memory storage adapters.
    DesktopStub,
}

impl HostStrategy {
    /// Returns a stable string token for diagnostics and runtime inspection.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::DesktopStub => "desktop-stub",
        }
    }
}

/// Host availability state for one storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    /// Area is available.
    Available,
    /// Area is not implemented or not supported on the active host.
    Unavailable,
}

impl CapabilityStatus {
    /// Returns whether the area can be used immediately.
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Typed error describing a rejected storage binding before any store operation executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The host does not provide the requested storage area.
    AreaUnavailable {
        /// Requested area name.
        area: String,
    },
}

impl std::fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AreaUnavailable { area } => write!(f, "storage area unavailable: {area}"),
        }
    }
}

impl std::error::Error for CapabilityError {}

/// Host capability snapshot for the well-known storage areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// `local` area availability.
    pub local_area: CapabilityStatus,
    /// `session` area availability.
    pub session_area: CapabilityStatus,
    /// `sync` area availability.
    pub sync_area: CapabilityStatus,
    /// Availability of areas with any other name.
    pub custom_areas: CapabilityStatus,
}

impl HostCapabilities {
    /// Browser-default capability posture (`localStorage` and `sessionStorage` only).
    pub const fn browser() -> Self {
        Self {
            local_area: CapabilityStatus::Available,
            session_area: CapabilityStatus::Available,
            sync_area: CapabilityStatus::Unavailable,
            custom_areas: CapabilityStatus::Unavailable,
        }
    }

    /// In-memory capability posture; every area name is accepted.
    pub const fn desktop_stub() -> Self {
        Self {
            local_area: CapabilityStatus::Available,
            session_area: CapabilityStatus::Available,
            sync_area: CapabilityStatus::Available,
            custom_areas: CapabilityStatus::Available,
        }
    }

    /// Returns the availability of `area`.
    pub fn area_status(&self, area: &StorageAreaName) -> CapabilityStatus {
        match area.as_str() {
            StorageAreaName::LOCAL => self.local_area,
            StorageAreaName::SESSION => self.session_area,
            StorageAreaName::SYNC => self.sync_area,
            _ => self.custom_areas,
        }
    }
}

/// Runtime-selected host service bundle injected into the inspector runtime.
#[derive(Clone)]
pub struct HostServices {
    /// Key-value store serving every available area.
    pub key_value: Rc<dyn KeyValueStore>,
    /// Host availability snapshot for storage areas.
    pub capabilities: HostCapabilities,
    /// Stable strategy identifier for diagnostics and policy.
    pub host_strategy: HostStrategy,
}

impl HostServices {
    /// Returns the store for `area` when the host provides that area.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::AreaUnavailable`] when the area is not provided.
    pub fn store_for_area(
        &self,
        area: &StorageAreaName,
    ) -> Result<Rc<dyn KeyValueStore>, CapabilityError> {
        if self.capabilities.area_status(area).is_available() {
            Ok(self.key_value.clone())
        } else {
            Err(CapabilityError::AreaUnavailable {
                area: area.to_string(),
            })
        }
    }
}
