//! Multi-area key-value storage contracts, change notifications, and in-memory adapters.

use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
};

use serde::{Deserialize, Serialize};

use super::value::{StorageEntry, StorageValue};

/// Object-safe boxed future used by [`KeyValueStore`] async methods.
pub type KeyValueStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Callback invoked after a committed write to any storage area.
pub type ChangeListener = Rc<dyn Fn(&StorageChange)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Opaque logical storage area identifier (for example `local`, `sync`, or `session`).
///
/// Interpretation is left to the store implementation.
pub struct StorageAreaName(String);

impl StorageAreaName {
    /// Persistent per-profile area.
    pub const LOCAL: &'static str = "local";
    /// Cross-device synchronized area.
    pub const SYNC: &'static str = "sync";
    /// Area cleared when the browsing session ends.
    pub const SESSION: &'static str = "session";

    /// Creates an area name from raw text.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the `local` area.
    pub fn local() -> Self {
        Self::new(Self::LOCAL)
    }

    /// Returns the `session` area.
    pub fn session() -> Self {
        Self::new(Self::SESSION)
    }

    /// Returns the string form of the area name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StorageAreaName {
    fn default() -> Self {
        Self::local()
    }
}

impl std::fmt::Display for StorageAreaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageAreaName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Change notification delivered after a write has been committed.
pub struct StorageChange {
    /// Area the write targeted.
    pub area: StorageAreaName,
    /// Keys whose values were written or removed.
    pub changed_keys: BTreeSet<String>,
}

impl StorageChange {
    /// Creates a notification for a single changed key.
    pub fn single(area: StorageAreaName, key: impl Into<String>) -> Self {
        Self {
            area,
            changed_keys: BTreeSet::from([key.into()]),
        }
    }
}

/// Host service for reading, writing, and observing key-value storage areas.
pub trait KeyValueStore {
    /// Reads every entry of `area` in the store's enumeration order.
    fn get_all<'a>(
        &'a self,
        area: &'a StorageAreaName,
    ) -> KeyValueStoreFuture<'a, Result<Vec<StorageEntry>, String>>;

    /// Reads one entry of `area`.
    fn get<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StorageValue>, String>>;

    /// Writes one entry of `area`. Listeners are notified once the write is committed.
    fn set<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
        value: StorageValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>>;

    /// Removes one entry of `area`. Listeners are notified when a value was present.
    fn remove<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<(), String>>;

    /// Registers a change listener for all areas.
    ///
    /// The listener stays registered until the returned handle is dropped.
    fn subscribe(&self, listener: ChangeListener) -> ChangeSubscription;
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: Vec<(u64, ChangeListener)>,
}

#[derive(Clone, Default)]
/// Registry of change listeners shared by store implementations.
pub struct ChangeListeners {
    inner: Rc<RefCell<ListenerTable>>,
}

impl std::fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("len", &self.len())
            .finish()
    }
}

impl ChangeListeners {
    /// Registers `listener` and returns the handle that keeps it alive.
    pub fn subscribe(&self, listener: ChangeListener) -> ChangeSubscription {
        let mut table = self.inner.borrow_mut();
        table.next_id = table.next_id.saturating_add(1);
        let id = table.next_id;
        table.listeners.push((id, listener));
        ChangeSubscription {
            id,
            table: Rc::downgrade(&self.inner),
        }
    }

    /// Delivers `change` to every registered listener.
    ///
    /// Listeners may subscribe or unsubscribe while being notified.
    pub fn notify(&self, change: &StorageChange) {
        let listeners: Vec<ChangeListener> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(change);
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Returns whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for one registered [`ChangeListener`]; dropping it unregisters the listener.
#[must_use = "dropping a subscription immediately unregisters its listener"]
pub struct ChangeSubscription {
    id: u64,
    table: Weak<RefCell<ListenerTable>>,
}

impl ChangeSubscription {
    /// Returns a handle that is not attached to any registry.
    pub fn detached() -> Self {
        Self {
            id: 0,
            table: Weak::new(),
        }
    }

    /// Returns whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.table
            .upgrade()
            .map(|table| table.borrow().listeners.iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op key-value store for unsupported targets and baseline tests.
pub struct NoopKeyValueStore;

impl KeyValueStore for NoopKeyValueStore {
    fn get_all<'a>(
        &'a self,
        _area: &'a StorageAreaName,
    ) -> KeyValueStoreFuture<'a, Result<Vec<StorageEntry>, String>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn get<'a>(
        &'a self,
        _area: &'a StorageAreaName,
        _key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StorageValue>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn set<'a>(
        &'a self,
        _area: &'a StorageAreaName,
        _key: &'a str,
        _value: StorageValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn remove<'a>(
        &'a self,
        _area: &'a StorageAreaName,
        _key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn subscribe(&self, _listener: ChangeListener) -> ChangeSubscription {
        ChangeSubscription::detached()
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory multi-area store preserving insertion order per area.
///
/// Writes notify listeners synchronously after the mutation is applied.
pub struct MemoryKeyValueStore {
    areas: Rc<RefCell<HashMap<StorageAreaName, Vec<StorageEntry>>>>,
    listeners: ChangeListeners,
}

impl MemoryKeyValueStore {
    /// Writes an entry immediately and notifies listeners.
    ///
    /// Updating an existing key keeps its enumeration position.
    pub fn set_now(&self, area: &StorageAreaName, key: &str, value: impl Into<StorageValue>) {
        let value = value.into();
        {
            let mut areas = self.areas.borrow_mut();
            let entries = areas.entry(area.clone()).or_default();
            match entries.iter_mut().find(|entry| entry.key == key) {
                Some(entry) => entry.value = value,
                None => entries.push(StorageEntry::new(key, value)),
            }
        }
        self.listeners
            .notify(&StorageChange::single(area.clone(), key));
    }

    /// Removes an entry immediately, notifying listeners when it existed.
    pub fn remove_now(&self, area: &StorageAreaName, key: &str) {
        let removed = {
            let mut areas = self.areas.borrow_mut();
            match areas.get_mut(area) {
                Some(entries) => {
                    let before = entries.len();
                    entries.retain(|entry| entry.key != key);
                    entries.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.listeners
                .notify(&StorageChange::single(area.clone(), key));
        }
    }

    /// Returns a snapshot of all entries in `area`.
    pub fn entries(&self, area: &StorageAreaName) -> Vec<StorageEntry> {
        self.areas.borrow().get(area).cloned().unwrap_or_default()
    }

    /// Returns the number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_all<'a>(
        &'a self,
        area: &'a StorageAreaName,
    ) -> KeyValueStoreFuture<'a, Result<Vec<StorageEntry>, String>> {
        Box::pin(async move { Ok(self.entries(area)) })
    }

    fn get<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StorageValue>, String>> {
        Box::pin(async move {
            Ok(self.areas.borrow().get(area).and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| entry.key == key)
                    .map(|entry| entry.value.clone())
            }))
        })
    }

    fn set<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
        value: StorageValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.set_now(area, key, value);
            Ok(())
        })
    }

    fn remove<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.remove_now(area, key);
            Ok(())
        })
    }

    fn subscribe(&self, listener: ChangeListener) -> ChangeSubscription {
        self.listeners.subscribe(listener)
    }
}
