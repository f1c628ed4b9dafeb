//! Web Storage (`localStorage` / `sessionStorage`) backed key-value store.
//!
//! Each entry is stored as JSON text under its own key. Writes made through this adapter notify
//! listeners in the current document directly; writes made by other documents arrive through the
//! window `storage` event.

use std::{cell::Cell, rc::Rc};

use platform_host::{
    ChangeListener, ChangeListeners, ChangeSubscription, KeyValueStore, KeyValueStoreFuture,
    StorageAreaName, StorageChange, StorageEntry, StorageValue,
};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast};

/// Decodes stored text into a value. Text that is not valid JSON is surfaced as a string.
pub fn decode_stored_text(raw: &str) -> StorageValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(StorageValue::from)
        .unwrap_or_else(|_| StorageValue::Str(raw.to_string()))
}

/// Encodes a value as the JSON text persisted for its key.
///
/// # Errors
///
/// Returns an error when the value cannot be represented as JSON.
pub fn encode_stored_value(value: &StorageValue) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Default)]
/// Browser key-value store over the `local` and `session` Web Storage areas.
pub struct WebKeyValueStore {
    listeners: ChangeListeners,
    storage_bridge_installed: Rc<Cell<bool>>,
}

impl WebKeyValueStore {
    #[cfg(target_arch = "wasm32")]
    fn web_storage(area: &StorageAreaName) -> Result<web_sys::Storage, String> {
        let window = web_sys::window().ok_or_else(|| "window unavailable".to_string())?;
        let storage = match area.as_str() {
            StorageAreaName::LOCAL => window.local_storage(),
            StorageAreaName::SESSION => window.session_storage(),
            other => return Err(format!("storage area `{other}` is not backed by Web Storage")),
        };
        storage
            .ok()
            .flatten()
            .ok_or_else(|| format!("{area} storage unavailable"))
    }

    fn read_all(area: &StorageAreaName) -> Result<Vec<StorageEntry>, String> {
        #[cfg(target_arch = "wasm32")]
        {
            let storage = Self::web_storage(area)?;
            let len = storage
                .length()
                .map_err(|e| format!("{area} storage length failed: {e:?}"))?;
            let mut entries = Vec::with_capacity(len as usize);
            for index in 0..len {
                let Some(key) = storage
                    .key(index)
                    .map_err(|e| format!("{area} storage key({index}) failed: {e:?}"))?
                else {
                    continue;
                };
                let Some(raw) = storage
                    .get_item(&key)
                    .map_err(|e| format!("{area} storage get_item failed: {e:?}"))?
                else {
                    continue;
                };
                let value = decode_stored_text(&raw);
                entries.push(StorageEntry { key, value });
            }
            Ok(entries)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = area;
            Ok(Vec::new())
        }
    }

    fn read_one(area: &StorageAreaName, key: &str) -> Result<Option<StorageValue>, String> {
        #[cfg(target_arch = "wasm32")]
        {
            let storage = Self::web_storage(area)?;
            let raw = storage
                .get_item(key)
                .map_err(|e| format!("{area} storage get_item failed: {e:?}"))?;
            Ok(raw.as_deref().map(decode_stored_text))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (area, key);
            Ok(None)
        }
    }

    fn write_one(area: &StorageAreaName, key: &str, value: &StorageValue) -> Result<(), String> {
        let raw = encode_stored_value(value)?;

        #[cfg(target_arch = "wasm32")]
        {
            let storage = Self::web_storage(area)?;
            storage
                .set_item(key, &raw)
                .map_err(|e| format!("{area} storage set_item failed: {e:?}"))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (area, key, raw);
            Ok(())
        }
    }

    fn remove_one(area: &StorageAreaName, key: &str) -> Result<bool, String> {
        #[cfg(target_arch = "wasm32")]
        {
            let storage = Self::web_storage(area)?;
            let existed = storage
                .get_item(key)
                .map_err(|e| format!("{area} storage get_item failed: {e:?}"))?
                .is_some();
            storage
                .remove_item(key)
                .map_err(|e| format!("{area} storage remove_item failed: {e:?}"))?;
            Ok(existed)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (area, key);
            Ok(false)
        }
    }

    /// Forwards window `storage` events (writes from other documents) to registered listeners.
    fn install_storage_event_bridge(&self) {
        if self.storage_bridge_installed.replace(true) {
            return;
        }

        #[cfg(target_arch = "wasm32")]
        {
            let Some(window) = web_sys::window() else {
                return;
            };
            let listeners = self.listeners.clone();
            let on_storage = Closure::<dyn FnMut(web_sys::StorageEvent)>::wrap(Box::new(
                move |event: web_sys::StorageEvent| {
                    let Some(area) = area_for_storage_event(&event) else {
                        return;
                    };
                    // `key` is absent when the whole area was cleared.
                    let changed_keys = event.key().into_iter().collect();
                    listeners.notify(&StorageChange { area, changed_keys });
                },
            ));
            if let Err(err) =
                window.add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())
            {
                self.storage_bridge_installed.set(false);
                web_sys::console::warn_1(&format!("storage event bridge failed: {err:?}").into());
                return;
            }
            on_storage.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn area_for_storage_event(event: &web_sys::StorageEvent) -> Option<StorageAreaName> {
    let window = web_sys::window()?;
    let changed = event.storage_area()?;
    if window.local_storage().ok().flatten().as_ref() == Some(&changed) {
        Some(StorageAreaName::local())
    } else if window.session_storage().ok().flatten().as_ref() == Some(&changed) {
        Some(StorageAreaName::session())
    } else {
        None
    }
}

impl KeyValueStore for WebKeyValueStore {
    fn get_all<'a>(
        &'a self,
        area: &'a StorageAreaName,
    ) -> KeyValueStoreFuture<'a, Result<Vec<StorageEntry>, String>> {
        Box::pin(async move { Self::read_all(area) })
    }

    fn get<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<Option<StorageValue>, String>> {
        Box::pin(async move { Self::read_one(area, key) })
    }

    fn set<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
        value: StorageValue,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            Self::write_one(area, key, &value)?;
            self.listeners
                .notify(&StorageChange::single(area.clone(), key));
            Ok(())
        })
    }

    fn remove<'a>(
        &'a self,
        area: &'a StorageAreaName,
        key: &'a str,
    ) -> KeyValueStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            if Self::remove_one(area, key)? {
                self.listeners
                    .notify(&StorageChange::single(area.clone(), key));
            }
            Ok(())
        })
    }

    fn subscribe(&self, listener: ChangeListener) -> ChangeSubscription {
        self.install_storage_event_bridge();
        self.listeners.subscribe(listener)
    }
}
