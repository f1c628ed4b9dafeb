use std::rc::Rc;

use platform_host::{
    ChangeListener, ChangeSubscription, HostCapabilities, HostServices, HostStrategy,
    KeyValueStore, KeyValueStoreFuture, MemoryKeyValueStore, StorageAreaName, StorageEntry,
    StorageValue,
};

use crate::WebKeyValueStore;

/// Returns the compile-time selected host strategy for the active build.
pub const fn selected_host_strategy() -> HostStrategy {
    #[cfg(feature = "desktop-host-stub")]
    {
        HostStrategy::DesktopStub
    }

    #[cfg(not(feature = "desktop-host-stub"))]
    {
        HostStrategy::Browser
    }
}

/// Returns the selected host strategy as a stable string token.
pub fn host_strategy_name() -> &'static str {
    selected_host_strategy().as_str()
}

/// Adapter enum that erases the concrete key-value backend behind [`KeyValueStore`].
#[derive(Debug, Clone)]
pub enum KeyValueStoreAdapter {
    /// Browser Web Storage persistence.
    Browser(WebKeyValueStore),
    /// In-memory store used when no browser storage is wired in.
    DesktopStub(MemoryKeyValueStore),
}

impl KeyValueStore for KeyValueStoreAdapter {
    fn get_all<'a>(
        &'a self,
        area: &'a StorageAreaName,
    ) -> KeyValueStoreFuture<'a, Result<Vec<StorageEntry>, String>> {
        match self {
            Self::Browser(store) => store.get_all(area),
            Self::DesktopStub(store) => store.get_all(area),
        }
    }

    fn get<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StorageValue>, String>> {
        match self {
            Self::Browser(store) => store.get(area, key),
            Self::DesktopStub(store) => store.get(area, key),
        }
    }

    fn set<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
        value: StorageValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(store) => store.set(area, key, value),
            Self::DesktopStub(store) => store.set(area, key, value),
        }
    }

    fn remove<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        match self {
            Self::Browser(store) => store.remove(area, key),
            Self::DesktopStub(store) => store.remove(area, key),
        }
    }

    fn subscribe(&self, listener: ChangeListener) -> ChangeSubscription {
        match self {
            Self::Browser(store) => store.subscribe(listener),
            Self::DesktopStub(store) => store.subscribe(listener),
        }
    }
}

/// Builds the key-value adapter for the compile-time selected host strategy.
pub fn key_value_store() -> KeyValueStoreAdapter {
    match selected_host_strategy() {
        HostStrategy::Browser => KeyValueStoreAdapter::Browser(WebKeyValueStore::default()),
        HostStrategy::DesktopStub => {
            KeyValueStoreAdapter::DesktopStub(MemoryKeyValueStore::default())
        }
    }
}

/// Returns the storage capability posture for the compile-time selected host strategy.
pub const fn host_capabilities() -> HostCapabilities {
    match selected_host_strategy() {
        HostStrategy::Browser => HostCapabilities::browser(),
        HostStrategy::DesktopStub => HostCapabilities::desktop_stub(),
    }
}

/// Assembles the host service bundle injected into the inspector runtime.
pub fn build_host_services() -> HostServices {
    HostServices {
        key_value: Rc::new(key_value_store()),
        capabilities: host_capabilities(),
        host_strategy: selected_host_strategy(),
    }
}
