//! Storage inspector controller: reconciliation, edit transitions, and change subscriptions.
//!
//! All store operations are awaited on a single cooperative control flow. State borrows are never
//! held across an `.await`; patches are collected under the borrow and applied to the surface
//! after it is released.

use std::{cell::RefCell, rc::Rc};

use futures::future::LocalBoxFuture;
use leptos::logging;
use platform_host::{
    ChangeListener, ChangeSubscription, KeyValueStore, StorageAreaName, StorageChange,
    StorageValue, StorageValueType,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    canonical::{parse_edit_text, EditParseError},
    edit::{key_action, EditKeyAction, KeyPress},
    filter::KeyFilter,
    rows::{DisplayedRow, ReconcileReport, RowHandle, RowMode, RowTable},
    surface::{InspectorSurface, ShellView, ViewPatch},
};

/// Spawns detached local tasks (`leptos::spawn_local` in the browser).
pub type TaskSpawner = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Binding options captured when an inspector is initialized.
pub struct InspectorOptions {
    /// Storage area to inspect.
    pub area: StorageAreaName,
    /// Immutable substring every visible key must contain.
    pub base_filter: String,
    /// Optional help text rendered in the footer.
    pub footer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures of inspector operations. Each one is also shown on the surface.
pub enum InspectorError {
    /// The handle does not refer to a rendered row.
    #[error("row not found")]
    RowNotFound,
    /// The operation needs an open editor.
    #[error("row `{key}` is not being edited")]
    NotEditing {
        /// Row key.
        key: String,
    },
    /// The operation does not apply to the row's value type.
    #[error("row `{key}` holds a {value_type} value")]
    WrongValueType {
        /// Row key.
        key: String,
        /// Row value type.
        value_type: StorageValueType,
    },
    /// The edit buffer did not convert into a value.
    #[error(transparent)]
    Parse(#[from] EditParseError),
    /// The bulk read failed; the view kept its previous rows.
    #[error("storage read failed: {0}")]
    Read(String),
    /// The store rejected a write.
    #[error("storage write failed: {0}")]
    Write(String),
}

#[derive(Debug, Default)]
struct InspectorState {
    filter: KeyFilter,
    rows: RowTable,
    notice: Option<String>,
    issued_generation: u64,
    applied_generation: u64,
}

struct InspectorInner {
    options: InspectorOptions,
    store: Rc<dyn KeyValueStore>,
    surface: Rc<dyn InspectorSurface>,
    spawner: TaskSpawner,
    state: RefCell<InspectorState>,
    subscription: RefCell<Option<ChangeSubscription>>,
}

#[derive(Clone)]
/// Live, filterable, editable view over one storage area.
///
/// Cloning yields another handle to the same inspector. The change subscription is released by
/// [`StorageInspector::close`] or when the last handle is dropped.
pub struct StorageInspector {
    inner: Rc<InspectorInner>,
}

impl std::fmt::Debug for StorageInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageInspector")
            .field("options", &self.inner.options)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl StorageInspector {
    /// Binds an inspector to `options.area`, renders the shell, subscribes to store changes, and
    /// performs the initial reconcile.
    ///
    /// A failed initial read is not fatal: the notice is shown and the inspector stays usable.
    pub async fn initialize(
        options: InspectorOptions,
        store: Rc<dyn KeyValueStore>,
        surface: Rc<dyn InspectorSurface>,
        spawner: TaskSpawner,
    ) -> Self {
        let inspector = Self {
            inner: Rc::new(InspectorInner {
                state: RefCell::new(InspectorState {
                    filter: KeyFilter::new(options.base_filter.clone()),
                    ..InspectorState::default()
                }),
                options,
                store,
                surface,
                spawner,
                subscription: RefCell::new(None),
            }),
        };

        inspector
            .inner
            .surface
            .apply(ViewPatch::MountShell(ShellView {
                area: inspector.inner.options.area.clone(),
                base_filter: inspector.inner.options.base_filter.clone(),
                footer_text: inspector.inner.options.footer_text.clone(),
            }));
        inspector.subscribe();
        let _ = inspector.reconcile().await;
        inspector
    }

    fn subscribe(&self) {
        let weak = Rc::downgrade(&self.inner);
        let listener: ChangeListener = Rc::new(move |change: &StorageChange| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let inspector = StorageInspector { inner };
            if !inspector.is_relevant(change) {
                return;
            }
            inspector.schedule_reconcile();
        });
        let subscription = self.inner.store.subscribe(listener);
        *self.inner.subscription.borrow_mut() = Some(subscription);
    }

    fn is_relevant(&self, change: &StorageChange) -> bool {
        if change.area != self.inner.options.area {
            return false;
        }
        // An empty key set means the whole area changed (for example, it was cleared).
        if change.changed_keys.is_empty() {
            return true;
        }
        let state = self.inner.state.borrow();
        change
            .changed_keys
            .iter()
            .any(|key| state.filter.matches(key))
    }

    fn schedule_reconcile(&self) {
        let inspector = self.clone();
        (self.inner.spawner)(Box::pin(async move {
            let _ = inspector.reconcile().await;
        }));
    }

    /// Releases the change subscription. Further store changes are ignored.
    pub fn close(&self) {
        self.inner.subscription.borrow_mut().take();
    }

    /// Returns whether the inspector still listens to store changes.
    pub fn is_subscribed(&self) -> bool {
        self.inner
            .subscription
            .borrow()
            .as_ref()
            .is_some_and(ChangeSubscription::is_active)
    }

    /// Returns the binding options.
    pub fn options(&self) -> &InspectorOptions {
        &self.inner.options
    }

    /// Returns the current user filter.
    pub fn user_filter(&self) -> String {
        self.inner.state.borrow().filter.user().to_string()
    }

    /// Returns the current notice (for example, a failed read).
    pub fn notice(&self) -> Option<String> {
        self.inner.state.borrow().notice.clone()
    }

    /// Returns a snapshot of the row behind `handle`.
    pub fn row(&self, handle: RowHandle) -> Option<DisplayedRow> {
        self.inner.state.borrow().rows.get(handle).cloned()
    }

    /// Returns the handle of the rendered row for `key`.
    pub fn handle_for_key(&self, key: &str) -> Option<RowHandle> {
        self.inner.state.borrow().rows.handle_for_key(key)
    }

    /// Returns a snapshot of all rows in presentation order.
    pub fn rows(&self) -> Vec<(RowHandle, DisplayedRow)> {
        self.inner
            .state
            .borrow()
            .rows
            .rows()
            .map(|(handle, row)| (handle, row.clone()))
            .collect()
    }

    fn apply_all(&self, patches: Vec<ViewPatch>) {
        for patch in patches {
            self.inner.surface.apply(patch);
        }
    }

    /// Updates the user filter and reconciles.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::Read`] when the store read fails.
    pub async fn set_user_filter(
        &self,
        text: impl Into<String>,
    ) -> Result<ReconcileReport, InspectorError> {
        self.inner.state.borrow_mut().filter.set_user(text);
        self.reconcile().await
    }

    /// Reads the whole area and patches the view to match it.
    ///
    /// Each pass takes a generation ticket; a read that completes after a newer pass has already
    /// been applied is discarded, so the view always reflects the newest issued read.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::Read`] when the store read fails. The view then keeps its last
    /// reconciled rows and shows a notice.
    pub async fn reconcile(&self) -> Result<ReconcileReport, InspectorError> {
        let generation = {
            let mut state = self.inner.state.borrow_mut();
            state.issued_generation += 1;
            state.issued_generation
        };

        let read = self.inner.store.get_all(&self.inner.options.area).await;

        let mut patches = Vec::new();
        let result = {
            let mut state = self.inner.state.borrow_mut();
            if generation < state.applied_generation {
                logging::debug_warn!(
                    "storage inspector discarded superseded read {generation} (applied {})",
                    state.applied_generation
                );
                return Ok(ReconcileReport {
                    discarded: true,
                    ..ReconcileReport::default()
                });
            }

            match read {
                Ok(entries) => {
                    state.applied_generation = generation;
                    let InspectorState { filter, rows, .. } = &mut *state;
                    let (row_patches, report) = rows.reconcile(&entries, filter);
                    patches.extend(row_patches);
                    if state.notice.take().is_some() {
                        patches.push(ViewPatch::SetNotice { notice: None });
                    }
                    Ok(report)
                }
                Err(err) => {
                    logging::warn!(
                        "storage inspector read of `{}` failed: {err}",
                        self.inner.options.area
                    );
                    let notice = format!("Could not read storage: {err}");
                    if state.notice.as_deref() != Some(notice.as_str()) {
                        state.notice = Some(notice.clone());
                        patches.push(ViewPatch::SetNotice {
                            notice: Some(notice),
                        });
                    }
                    Err(InspectorError::Read(err))
                }
            }
        };
        self.apply_all(patches);
        result
    }

    fn with_row<T>(
        &self,
        handle: RowHandle,
        f: impl FnOnce(&mut DisplayedRow, &mut Vec<ViewPatch>) -> Result<T, InspectorError>,
    ) -> Result<T, InspectorError> {
        let mut patches = Vec::new();
        let result = {
            let mut state = self.inner.state.borrow_mut();
            let row = state
                .rows
                .get_mut(handle)
                .ok_or(InspectorError::RowNotFound)?;
            f(row, &mut patches)
        };
        self.apply_all(patches);
        result
    }

    /// Shows `message` inline on the row, or as the inspector notice once the row is gone.
    fn show_row_error(&self, handle: RowHandle, message: String) {
        let shown = self.with_row(handle, |row, patches| {
            row.error = Some(message.clone());
            patches.push(ViewPatch::SetRowError {
                handle,
                error: Some(message.clone()),
            });
            Ok(())
        });
        if shown.is_err() {
            self.inner.state.borrow_mut().notice = Some(message.clone());
            self.apply_all(vec![ViewPatch::SetNotice {
                notice: Some(message),
            }]);
        }
    }

    /// Opens the editor of a non-boolean row with its current edit text.
    ///
    /// Opening an already open editor keeps its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::WrongValueType`] for boolean rows.
    pub fn begin_edit(&self, handle: RowHandle) -> Result<(), InspectorError> {
        self.with_row(handle, |row, patches| {
            if row.value_type == StorageValueType::Boolean {
                return Err(InspectorError::WrongValueType {
                    key: row.key.clone(),
                    value_type: row.value_type,
                });
            }
            if row.is_editing() {
                return Ok(());
            }
            let buffer = row.edit_text.clone();
            row.mode = RowMode::Editing {
                buffer: buffer.clone(),
            };
            patches.push(ViewPatch::OpenEditor { handle, buffer });
            Ok(())
        })
    }

    /// Replaces the editor text while the user types.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::NotEditing`] when the editor is closed.
    pub fn update_buffer(
        &self,
        handle: RowHandle,
        text: impl Into<String>,
    ) -> Result<(), InspectorError> {
        let text = text.into();
        self.with_row(handle, |row, _| match &mut row.mode {
            RowMode::Editing { buffer } => {
                *buffer = text;
                Ok(())
            }
            RowMode::Viewing => Err(InspectorError::NotEditing {
                key: row.key.clone(),
            }),
        })
    }

    /// Discards the editor buffer and restores the display. No store write occurs.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::NotEditing`] when the editor is closed.
    pub fn cancel_edit(&self, handle: RowHandle) -> Result<(), InspectorError> {
        let stale = self.with_row(handle, |row, patches| {
            if !row.is_editing() {
                return Err(InspectorError::NotEditing {
                    key: row.key.clone(),
                });
            }
            row.mode = RowMode::Viewing;
            patches.push(ViewPatch::CloseEditor { handle });
            if row.error.take().is_some() {
                patches.push(ViewPatch::SetRowError {
                    handle,
                    error: None,
                });
            }
            Ok(row.stale)
        })?;
        if stale {
            self.schedule_reconcile();
        }
        Ok(())
    }

    /// Parses the editor buffer for the row type and writes it to the store.
    ///
    /// On success the row shows the new value and returns to viewing. On a parse or store failure
    /// the editor stays open with an inline error.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::Parse`] or [`InspectorError::Write`] for the failures above and
    /// [`InspectorError::NotEditing`] when the editor is closed.
    pub async fn commit_edit(&self, handle: RowHandle) -> Result<(), InspectorError> {
        let parsed = self.with_row(handle, |row, _| {
            let RowMode::Editing { buffer } = &row.mode else {
                return Err(InspectorError::NotEditing {
                    key: row.key.clone(),
                });
            };
            Ok((
                row.key.clone(),
                parse_edit_text(row.value_type, buffer),
            ))
        })?;
        let (key, value) = match parsed {
            (key, Ok(value)) => (key, value),
            (_, Err(err)) => {
                self.show_row_error(handle, err.to_string());
                return Err(err.into());
            }
        };

        if let Err(err) = self
            .inner
            .store
            .set(&self.inner.options.area, &key, value.clone())
            .await
        {
            logging::warn!("storage inspector save of `{key}` failed: {err}");
            self.show_row_error(handle, format!("Save failed: {err}"));
            return Err(InspectorError::Write(err));
        }

        let retyped = match self.with_row(handle, |row, patches| {
            row.mode = RowMode::Viewing;
            patches.push(ViewPatch::CloseEditor { handle });
            if row.error.take().is_some() {
                patches.push(ViewPatch::SetRowError {
                    handle,
                    error: None,
                });
            }
            if value.value_type() != row.value_type {
                return Ok(true);
            }
            if row.refresh_value(value) {
                patches.push(ViewPatch::PatchText {
                    handle,
                    display_text: row.display_text.clone(),
                    edit_text: row.edit_text.clone(),
                });
            }
            Ok(row.stale)
        }) {
            Ok(needs_reconcile) => needs_reconcile,
            // The row was filtered away while the write was in flight.
            Err(InspectorError::RowNotFound) => false,
            Err(err) => return Err(err),
        };
        if retyped {
            self.schedule_reconcile();
        }
        Ok(())
    }

    /// Writes the negation of a boolean row's value.
    ///
    /// On success the row shows the new value and pulses; on failure it keeps the previous value
    /// and shows the error.
    ///
    /// # Errors
    ///
    /// Returns [`InspectorError::WrongValueType`] for non-boolean rows and
    /// [`InspectorError::Write`] when the store rejects the write.
    pub async fn toggle(&self, handle: RowHandle) -> Result<bool, InspectorError> {
        let (key, next) = self.with_row(handle, |row, _| match row.value.as_bool() {
            Some(current) => Ok((row.key.clone(), !current)),
            None => Err(InspectorError::WrongValueType {
                key: row.key.clone(),
                value_type: row.value_type,
            }),
        })?;

        if let Err(err) = self
            .inner
            .store
            .set(&self.inner.options.area, &key, StorageValue::Bool(next))
            .await
        {
            logging::warn!("storage inspector toggle of `{key}` failed: {err}");
            self.show_row_error(handle, format!("Toggle failed: {err}"));
            return Err(InspectorError::Write(err));
        }

        let applied = self.with_row(handle, |row, patches| {
            if row.refresh_value(StorageValue::Bool(next)) {
                patches.push(ViewPatch::PatchText {
                    handle,
                    display_text: row.display_text.clone(),
                    edit_text: row.edit_text.clone(),
                });
            }
            if row.error.take().is_some() {
                patches.push(ViewPatch::SetRowError {
                    handle,
                    error: None,
                });
            }
            patches.push(ViewPatch::Pulse { handle });
            Ok(())
        });
        match applied {
            Ok(()) | Err(InspectorError::RowNotFound) => Ok(next),
            Err(err) => Err(err),
        }
    }

    /// Routes a key press from inside a row to the matching edit transition.
    ///
    /// Returns the transition that ran, or `None` when the key has no meaning for the row.
    ///
    /// # Errors
    ///
    /// Propagates errors of [`StorageInspector::cancel_edit`] and
    /// [`StorageInspector::commit_edit`].
    pub async fn handle_key(
        &self,
        handle: RowHandle,
        press: &KeyPress,
    ) -> Result<Option<EditKeyAction>, InspectorError> {
        let action = {
            let state = self.inner.state.borrow();
            let row = state.rows.get(handle).ok_or(InspectorError::RowNotFound)?;
            if !row.is_editing() {
                return Ok(None);
            }
            key_action(row.value_type, press)
        };
        match action {
            Some(EditKeyAction::Cancel) => self.cancel_edit(handle)?,
            Some(EditKeyAction::Commit) => self.commit_edit(handle).await?,
            None => {}
        }
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::VecDeque};

    use futures::{
        channel::oneshot,
        executor::{LocalPool, LocalSpawner},
        task::LocalSpawnExt,
    };
    use platform_host::{ChangeListeners, MemoryKeyValueStore, StorageEntry};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::surface::MemoryInspectorSurface;

    #[derive(Default)]
    struct TestStore {
        data: MemoryKeyValueStore,
        listeners: ChangeListeners,
        fail_reads: Cell<bool>,
        fail_writes: Cell<bool>,
        reads: Cell<usize>,
        writes: Cell<usize>,
        gates: RefCell<VecDeque<oneshot::Receiver<()>>>,
        write_gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    impl TestStore {
        fn put(&self, area: &StorageAreaName, key: &str, value: impl Into<StorageValue>) {
            self.data.set_now(area, key, value);
            self.listeners
                .notify(&StorageChange::single(area.clone(), key));
        }

        fn put_silently(&self, key: &str, value: impl Into<StorageValue>) {
            self.data.set_now(&StorageAreaName::local(), key, value);
        }

        fn delete(&self, key: &str) {
            let area = StorageAreaName::local();
            self.data.remove_now(&area, key);
            self.listeners.notify(&StorageChange::single(area, key));
        }

        fn clear(&self, area: &StorageAreaName) {
            for entry in self.data.entries(area) {
                self.data.remove_now(area, &entry.key);
            }
            self.listeners.notify(&StorageChange {
                area: area.clone(),
                changed_keys: Default::default(),
            });
        }

        fn gate(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().push_back(rx);
            tx
        }

        fn gate_next_write(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            *self.write_gate.borrow_mut() = Some(rx);
            tx
        }

        fn value(&self, key: &str) -> Option<StorageValue> {
            self.data
                .entries(&StorageAreaName::local())
                .into_iter()
                .find(|entry| entry.key == key)
                .map(|entry| entry.value)
        }
    }

    impl KeyValueStore for TestStore {
        fn get_all<'a>(
            &'a self,
            area: &'a StorageAreaName,
        ) -> platform_host::KeyValueStoreFuture<'a, Result<Vec<StorageEntry>, String>> {
            self.reads.set(self.reads.get() + 1);
            let snapshot = self.data.entries(area);
            let gate = self.gates.borrow_mut().pop_front();
            let fail = self.fail_reads.get();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                if fail {
                    Err("quota backend offline".to_string())
                } else {
                    Ok(snapshot)
                }
            })
        }

        fn get<'a>(
            &'a self,
            area: &'a StorageAreaName,
            key: &'a str,
        ) -> platform_host::KeyValueStoreFuture<'a, Result<Option<StorageValue>, String>> {
            self.data.get(area, key)
        }

        fn set<'a>(
            &'a self,
            area: &'a StorageAreaName,
            key: &'a str,
            value: StorageValue,
        ) -> platform_host::KeyValueStoreFuture<'a, Result<(), String>> {
            let gate = self.write_gate.borrow_mut().take();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                self.writes.set(self.writes.get() + 1);
                if self.fail_writes.get() {
                    return Err("write rejected".to_string());
                }
                self.put(area, key, value);
                Ok(())
            })
        }

        fn remove<'a>(
            &'a self,
            area: &'a StorageAreaName,
            key: &'a str,
        ) -> platform_host::KeyValueStoreFuture<'a, Result<(), String>> {
            Box::pin(async move {
                self.data.remove_now(area, key);
                self.listeners
                    .notify(&StorageChange::single(area.clone(), key));
                Ok(())
            })
        }

        fn subscribe(&self, listener: ChangeListener) -> ChangeSubscription {
            self.listeners.subscribe(listener)
        }
    }

    struct Harness {
        pool: LocalPool,
        store: Rc<TestStore>,
        surface: MemoryInspectorSurface,
        inspector: StorageInspector,
    }

    fn spawner_for(spawner: LocalSpawner) -> TaskSpawner {
        Rc::new(move |task: LocalBoxFuture<'static, ()>| {
            let _ = spawner.spawn_local(task);
        })
    }

    fn harness(base_filter: &str, seed: &[(&str, StorageValue)]) -> Harness {
        let store = Rc::new(TestStore::default());
        for (key, value) in seed {
            store.put_silently(key, value.clone());
        }
        let surface = MemoryInspectorSurface::default();
        let mut pool = LocalPool::new();
        let inspector = pool.run_until(StorageInspector::initialize(
            InspectorOptions {
                area: StorageAreaName::local(),
                base_filter: base_filter.to_string(),
                footer_text: Some("Changes save immediately.".into()),
            },
            store.clone(),
            Rc::new(surface.clone()),
            spawner_for(pool.spawner()),
        ));
        pool.run_until_stalled();
        Harness {
            pool,
            store,
            surface,
            inspector,
        }
    }

    fn handle(h: &Harness, key: &str) -> RowHandle {
        h.inspector.handle_for_key(key).expect("rendered row")
    }

    #[test]
    fn initialize_mounts_shell_and_renders_filtered_rows() {
        let h = harness(
            "app.",
            &[
                ("app.theme", StorageValue::Str("dark".into())),
                ("other", StorageValue::Num(1.0)),
                ("app.count", StorageValue::Num(3.0)),
            ],
        );

        let shell = h.surface.shell().expect("shell mounted");
        assert_eq!(shell.base_filter, "app.");
        assert_eq!(shell.footer_text.as_deref(), Some("Changes save immediately."));
        assert_eq!(h.surface.keys(), vec!["app.theme", "app.count"]);
        assert!(h.inspector.is_subscribed());
    }

    #[test]
    fn user_filter_narrows_and_restores_rows() {
        let mut h = harness(
            "",
            &[
                ("config.color", StorageValue::Str("red".into())),
                ("config.size", StorageValue::Num(2.0)),
                ("session", StorageValue::Bool(true)),
            ],
        );

        let report = h
            .pool
            .run_until(h.inspector.set_user_filter("color"))
            .expect("reconcile");
        assert_eq!(report.removed, 2);
        assert_eq!(h.surface.keys(), vec!["config.color"]);
        assert_eq!(h.inspector.user_filter(), "color");

        h.pool
            .run_until(h.inspector.set_user_filter(""))
            .expect("reconcile");
        assert_eq!(h.surface.keys(), vec!["config.color", "config.size", "session"]);
    }

    #[test]
    fn repeated_reconcile_without_changes_emits_no_patches() {
        let mut h = harness("", &[("a", StorageValue::Obj(json!({"x": [1, 2]})))]);
        h.surface.take_patches();

        let report = h.pool.run_until(h.inspector.reconcile()).expect("reconcile");

        assert!(report.is_noop());
        assert!(h.surface.patches().is_empty());
    }

    #[test]
    fn external_same_type_change_patches_row_in_place() {
        let mut h = harness("", &[("count", StorageValue::Num(1.0))]);
        let before = handle(&h, "count");
        h.surface.take_patches();

        h.store.put(&StorageAreaName::local(), "count", 2.0);
        h.pool.run_until_stalled();

        assert_eq!(handle(&h, "count"), before);
        assert_eq!(
            h.surface.take_patches(),
            vec![ViewPatch::PatchText {
                handle: before,
                display_text: "2".into(),
                edit_text: "2".into(),
            }]
        );
    }

    #[test]
    fn external_type_change_replaces_row() {
        let mut h = harness("", &[("flag", StorageValue::Str("true".into()))]);
        let before = handle(&h, "flag");

        h.store.put(&StorageAreaName::local(), "flag", true);
        h.pool.run_until_stalled();

        let after = handle(&h, "flag");
        assert_ne!(before, after);
        assert_eq!(
            h.surface.row_for_key("flag").map(|row| row.value_type),
            Some(StorageValueType::Boolean)
        );
    }

    #[test]
    fn irrelevant_changes_do_not_trigger_reads() {
        let mut h = harness("app.", &[("app.a", StorageValue::Num(1.0))]);
        let reads = h.store.reads.get();

        h.store.put(&StorageAreaName::local(), "unrelated", 5.0);
        h.store.put(&StorageAreaName::session(), "app.a", 5.0);
        h.pool.run_until_stalled();
        assert_eq!(h.store.reads.get(), reads);

        h.store.put(&StorageAreaName::local(), "app.b", 5.0);
        h.pool.run_until_stalled();
        assert_eq!(h.store.reads.get(), reads + 1);
        assert_eq!(h.surface.keys(), vec!["app.a", "app.b"]);
    }

    #[test]
    fn area_wide_change_triggers_reconcile() {
        let mut h = harness(
            "",
            &[("a", StorageValue::Num(1.0)), ("b", StorageValue::Num(2.0))],
        );

        h.store.clear(&StorageAreaName::local());
        h.pool.run_until_stalled();

        assert!(h.surface.keys().is_empty());
    }

    #[test]
    fn open_editor_buffer_survives_external_updates() {
        let mut h = harness("", &[("name", StorageValue::Str("ada".into()))]);
        let row = handle(&h, "name");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "grace").expect("buffer");

        h.store.put(&StorageAreaName::local(), "name", "linus");
        h.pool.run_until_stalled();

        let current = h.inspector.row(row).expect("row");
        assert_eq!(current.editor_buffer(), Some("grace"));
        assert_eq!(current.display_text, "linus");
        assert_eq!(
            h.surface.row_for_key("name").and_then(|row| row.editor),
            Some("ada".to_string())
        );
    }

    #[test]
    fn object_edit_commits_structured_value() {
        let mut h = harness("", &[("cfg", StorageValue::Obj(json!({"x": 1})))]);
        let row = handle(&h, "cfg");
        assert_eq!(h.surface.row_for_key("cfg").expect("row").display_text, "{\"x\":1}");

        h.inspector.begin_edit(row).expect("edit");
        assert_eq!(
            h.inspector.row(row).expect("row").editor_buffer(),
            Some("{\n  \"x\": 1\n}")
        );
        h.inspector.update_buffer(row, "{\"x\": 2}").expect("buffer");
        h.pool.run_until(h.inspector.commit_edit(row)).expect("commit");
        h.pool.run_until_stalled();

        assert_eq!(h.store.value("cfg"), Some(StorageValue::Obj(json!({"x": 2}))));
        let rendered = h.surface.row_for_key("cfg").expect("row");
        assert_eq!(rendered.display_text, "{\"x\":2}");
        assert_eq!(rendered.editor, None);
        assert_eq!(handle(&h, "cfg"), row);
    }

    #[test]
    fn invalid_number_keeps_editor_open_with_error() {
        let mut h = harness("", &[("n", StorageValue::Num(4.0))]);
        let row = handle(&h, "n");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "four").expect("buffer");

        let result = h.pool.run_until(h.inspector.commit_edit(row));

        assert_eq!(
            result,
            Err(InspectorError::Parse(EditParseError::NotANumber("four".into())))
        );
        assert_eq!(h.store.writes.get(), 0);
        let rendered = h.surface.row_for_key("n").expect("row");
        assert_eq!(rendered.editor.as_deref(), Some("4"));
        assert!(rendered.error.is_some());
        assert_eq!(h.inspector.row(row).expect("row").editor_buffer(), Some("four"));
    }

    #[test]
    fn failed_write_keeps_editor_open() {
        let mut h = harness("", &[("s", StorageValue::Str("a".into()))]);
        let row = handle(&h, "s");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "b").expect("buffer");
        h.store.fail_writes.set(true);

        let result = h.pool.run_until(h.inspector.commit_edit(row));

        assert_eq!(result, Err(InspectorError::Write("write rejected".into())));
        assert!(h.inspector.row(row).expect("row").is_editing());
        assert_eq!(h.store.value("s"), Some(StorageValue::Str("a".into())));
    }

    #[test]
    fn failed_write_for_filtered_out_row_surfaces_as_notice() {
        let mut h = harness("", &[("s", StorageValue::Str("a".into()))]);
        let row = handle(&h, "s");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "b").expect("buffer");
        h.store.fail_writes.set(true);
        let release = h.store.gate_next_write();

        let inspector = h.inspector.clone();
        let pending = h
            .pool
            .spawner()
            .spawn_local_with_handle(async move { inspector.commit_edit(row).await })
            .expect("spawn commit");
        h.pool.run_until_stalled();
        h.pool
            .run_until(h.inspector.set_user_filter("zzz"))
            .expect("filter");
        assert!(h.surface.keys().is_empty());
        release.send(()).expect("release write");
        let result = h.pool.run_until(pending);

        assert_eq!(result, Err(InspectorError::Write("write rejected".into())));
        assert_eq!(
            h.surface.notice().as_deref(),
            Some("Save failed: write rejected")
        );
        assert_eq!(
            h.inspector.notice().as_deref(),
            Some("Save failed: write rejected")
        );
    }

    #[test]
    fn editing_one_row_is_isolated_from_changes_to_another() {
        let mut h = harness(
            "",
            &[
                ("a", StorageValue::Str("first".into())),
                ("b", StorageValue::Num(1.0)),
            ],
        );
        let row_a = handle(&h, "a");
        h.inspector.begin_edit(row_a).expect("edit");
        h.inspector.update_buffer(row_a, "draft").expect("buffer");
        h.surface.take_patches();

        h.store.put(&StorageAreaName::local(), "b", 2.0);
        h.pool.run_until_stalled();

        assert_eq!(handle(&h, "a"), row_a);
        let current = h.inspector.row(row_a).expect("row");
        assert_eq!(current.editor_buffer(), Some("draft"));
        assert_eq!(current.display_text, "first");
        assert!(h
            .surface
            .take_patches()
            .iter()
            .all(|patch| !matches!(patch, ViewPatch::RemoveRow { handle } if *handle == row_a)));
        assert_eq!(h.surface.row_for_key("b").expect("row").display_text, "2");
    }

    #[test]
    fn object_key_order_is_kept_through_an_edit() {
        let mut h = harness("", &[("o", StorageValue::Obj(json!({"b": 1, "a": 2})))]);
        let row = handle(&h, "o");
        assert_eq!(
            h.surface.row_for_key("o").expect("row").display_text,
            "{\"b\":1,\"a\":2}"
        );

        h.inspector.begin_edit(row).expect("edit");
        h.inspector
            .update_buffer(row, "{\"b\": 1, \"a\": 3}")
            .expect("buffer");
        h.pool.run_until(h.inspector.commit_edit(row)).expect("commit");
        h.pool.run_until_stalled();

        assert_eq!(
            h.surface.row_for_key("o").expect("row").display_text,
            "{\"b\":1,\"a\":3}"
        );
    }

    #[test]
    fn escape_from_row_controls_cancels_and_enter_there_does_not_commit() {
        let mut h = harness("", &[("s", StorageValue::Str("a".into()))]);
        let row = handle(&h, "s");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "b").expect("buffer");

        let action = h
            .pool
            .run_until(h.inspector.handle_key(row, &KeyPress::new("Enter").outside_editor()))
            .expect("key");
        assert_eq!(action, None);
        assert_eq!(h.store.writes.get(), 0);

        let action = h
            .pool
            .run_until(h.inspector.handle_key(row, &KeyPress::new("Escape").outside_editor()))
            .expect("key");
        assert_eq!(action, Some(EditKeyAction::Cancel));
        assert!(!h.inspector.row(row).expect("row").is_editing());
        assert_eq!(h.store.value("s"), Some(StorageValue::Str("a".into())));
    }

    #[test]
    fn cancel_restores_display_without_writing() {
        let mut h = harness("", &[("s", StorageValue::Str("a".into()))]);
        let row = handle(&h, "s");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "changed").expect("buffer");

        h.inspector.cancel_edit(row).expect("cancel");
        h.pool.run_until_stalled();

        assert_eq!(h.store.writes.get(), 0);
        assert!(!h.inspector.row(row).expect("row").is_editing());
        assert_eq!(h.surface.row_for_key("s").expect("row").editor, None);
        assert_eq!(
            h.inspector.cancel_edit(row),
            Err(InspectorError::NotEditing { key: "s".into() })
        );
    }

    #[test]
    fn keyboard_routes_to_commit_and_cancel() {
        let mut h = harness(
            "",
            &[
                ("s", StorageValue::Str("a".into())),
                ("o", StorageValue::Obj(json!({}))),
            ],
        );
        let string_row = handle(&h, "s");
        h.inspector.begin_edit(string_row).expect("edit");
        h.inspector.update_buffer(string_row, "b").expect("buffer");
        let action = h
            .pool
            .run_until(h.inspector.handle_key(string_row, &KeyPress::new("Enter")))
            .expect("key");
        assert_eq!(action, Some(EditKeyAction::Commit));
        assert_eq!(h.store.value("s"), Some(StorageValue::Str("b".into())));

        let object_row = handle(&h, "o");
        h.inspector.begin_edit(object_row).expect("edit");
        let action = h
            .pool
            .run_until(h.inspector.handle_key(object_row, &KeyPress::new("Enter")))
            .expect("key");
        assert_eq!(action, None);
        assert!(h.inspector.row(object_row).expect("row").is_editing());
        let action = h
            .pool
            .run_until(h.inspector.handle_key(object_row, &KeyPress::new("Escape")))
            .expect("key");
        assert_eq!(action, Some(EditKeyAction::Cancel));
        assert!(!h.inspector.row(object_row).expect("row").is_editing());
    }

    #[test]
    fn boolean_rows_toggle_instead_of_editing() {
        let mut h = harness("", &[("enabled", StorageValue::Bool(false))]);
        let row = handle(&h, "enabled");
        assert!(matches!(
            h.inspector.begin_edit(row),
            Err(InspectorError::WrongValueType { .. })
        ));

        let next = h.pool.run_until(h.inspector.toggle(row)).expect("toggle");
        h.pool.run_until_stalled();

        assert!(next);
        assert_eq!(h.store.value("enabled"), Some(StorageValue::Bool(true)));
        let rendered = h.surface.row_for_key("enabled").expect("row");
        assert_eq!(rendered.display_text, "true");
        assert_eq!(rendered.pulses, 1);
    }

    #[test]
    fn failed_toggle_keeps_previous_value_and_shows_error() {
        let mut h = harness("", &[("enabled", StorageValue::Bool(true))]);
        let row = handle(&h, "enabled");
        h.store.fail_writes.set(true);

        let result = h.pool.run_until(h.inspector.toggle(row));

        assert_eq!(result, Err(InspectorError::Write("write rejected".into())));
        let rendered = h.surface.row_for_key("enabled").expect("row");
        assert_eq!(rendered.display_text, "true");
        assert_eq!(rendered.pulses, 0);
        assert!(rendered.error.is_some());
        assert_eq!(h.inspector.row(row).expect("row").value, StorageValue::Bool(true));
    }

    #[test]
    fn toggle_rejects_non_boolean_rows() {
        let mut h = harness("", &[("n", StorageValue::Num(1.0))]);
        let row = handle(&h, "n");
        assert_eq!(
            h.pool.run_until(h.inspector.toggle(row)),
            Err(InspectorError::WrongValueType {
                key: "n".into(),
                value_type: StorageValueType::Number,
            })
        );
    }

    #[test]
    fn superseded_read_is_discarded() {
        let mut h = harness("", &[("a", StorageValue::Num(1.0))]);
        let older_gate = h.store.gate();
        h.store.put_silently("a", 2.0);
        let older_report = Rc::new(RefCell::new(None));
        {
            let inspector = h.inspector.clone();
            let older_report = older_report.clone();
            h.pool
                .spawner()
                .spawn_local(async move {
                    *older_report.borrow_mut() = Some(inspector.reconcile().await);
                })
                .expect("spawn");
        }
        h.pool.run_until_stalled();

        let newer_gate = h.store.gate();
        h.store.put_silently("a", 3.0);
        let newer = {
            let inspector = h.inspector.clone();
            async move { inspector.reconcile().await }
        };
        let _ = newer_gate.send(());
        h.pool.run_until(newer).expect("newer reconcile");
        assert_eq!(h.surface.row_for_key("a").expect("row").display_text, "3");

        let _ = older_gate.send(());
        h.pool.run_until_stalled();

        let older = older_report.borrow_mut().take().expect("older finished");
        assert!(older.expect("older read").discarded);
        assert_eq!(h.surface.row_for_key("a").expect("row").display_text, "3");
    }

    #[test]
    fn failed_read_keeps_rows_and_shows_notice() {
        let mut h = harness("", &[("a", StorageValue::Num(1.0))]);
        h.store.fail_reads.set(true);

        let result = h.pool.run_until(h.inspector.reconcile());

        assert!(matches!(result, Err(InspectorError::Read(_))));
        assert_eq!(h.surface.keys(), vec!["a"]);
        assert!(h.surface.notice().is_some());

        h.store.fail_reads.set(false);
        h.pool.run_until(h.inspector.reconcile()).expect("reconcile");
        assert_eq!(h.surface.notice(), None);
        assert_eq!(h.inspector.notice(), None);
    }

    #[test]
    fn external_delete_pins_open_editor_until_cancel() {
        let mut h = harness("", &[("draft", StorageValue::Str("v1".into()))]);
        let row = handle(&h, "draft");
        h.inspector.begin_edit(row).expect("edit");

        h.store.delete("draft");
        h.pool.run_until_stalled();
        assert!(h.inspector.row(row).expect("pinned").stale);
        assert_eq!(h.surface.keys(), vec!["draft"]);

        h.inspector.cancel_edit(row).expect("cancel");
        h.pool.run_until_stalled();
        assert!(h.surface.keys().is_empty());
    }

    #[test]
    fn committing_a_different_type_replaces_the_row() {
        let mut h = harness("", &[("o", StorageValue::Obj(json!({"x": 1})))]);
        let row = handle(&h, "o");
        h.inspector.begin_edit(row).expect("edit");
        h.inspector.update_buffer(row, "5").expect("buffer");

        h.pool.run_until(h.inspector.commit_edit(row)).expect("commit");
        h.pool.run_until_stalled();

        assert_eq!(h.store.value("o"), Some(StorageValue::Num(5.0)));
        let replaced = handle(&h, "o");
        assert_ne!(replaced, row);
        assert_eq!(
            h.inspector.row(replaced).map(|row| row.value_type),
            Some(StorageValueType::Number)
        );
    }

    #[test]
    fn close_releases_the_subscription() {
        let mut h = harness("", &[("a", StorageValue::Num(1.0))]);
        assert_eq!(h.store.listeners.len(), 1);

        h.inspector.close();

        assert!(!h.inspector.is_subscribed());
        assert_eq!(h.store.listeners.len(), 0);
        let reads = h.store.reads.get();
        h.store.put(&StorageAreaName::local(), "a", 2.0);
        h.pool.run_until_stalled();
        assert_eq!(h.store.reads.get(), reads);
    }

    #[test]
    fn dropping_the_last_handle_releases_the_subscription() {
        let h = harness("", &[]);
        let store = h.store.clone();
        drop(h);
        assert!(store.listeners.is_empty());
    }
}
