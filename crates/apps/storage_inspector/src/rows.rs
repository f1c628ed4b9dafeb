//! Row view-models and the identity-indexed row arena reconciled against store contents.

use std::collections::{HashMap, HashSet};

use platform_host::{StorageEntry, StorageValue, StorageValueType};

use crate::{
    canonical::{display_text, edit_text},
    filter::KeyFilter,
    surface::ViewPatch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Opaque handle to a rendered row. Handles are never reused for a different row.
pub struct RowHandle {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for RowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row-{}-{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Identity used to match a rendered row across reconciliation passes.
///
/// The value type is part of the identity: the edit affordance differs by type, so a type change
/// yields a fresh row rather than an in-place patch.
pub struct RowIdentity {
    /// Entry key.
    pub key: String,
    /// Discriminant of the entry value.
    pub value_type: StorageValueType,
}

impl RowIdentity {
    /// Returns the identity of `entry`.
    pub fn of(entry: &StorageEntry) -> Self {
        Self {
            key: entry.key.clone(),
            value_type: entry.value.value_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Per-row edit state.
pub enum RowMode {
    /// Value shown read-only.
    Viewing,
    /// Editor open; `buffer` is owned by the user until commit or cancel.
    Editing {
        /// Current editor text.
        buffer: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// View-model of one visible entry.
pub struct DisplayedRow {
    /// Entry key.
    pub key: String,
    /// Cached value from the last reconcile or committed write.
    pub value: StorageValue,
    /// Discriminant of `value`.
    pub value_type: StorageValueType,
    /// Compact rendered value.
    pub display_text: String,
    /// Editable rendered value.
    pub edit_text: String,
    /// Edit state.
    pub mode: RowMode,
    /// Inline error shown on the row.
    pub error: Option<String>,
    /// Set while an open editor outlives its entry (deleted or retyped elsewhere).
    pub stale: bool,
}

impl DisplayedRow {
    /// Builds a `Viewing` row for `entry`.
    pub fn new(entry: &StorageEntry) -> Self {
        Self {
            key: entry.key.clone(),
            value_type: entry.value.value_type(),
            display_text: display_text(&entry.value),
            edit_text: edit_text(&entry.value),
            value: entry.value.clone(),
            mode: RowMode::Viewing,
            error: None,
            stale: false,
        }
    }

    /// Returns the row identity.
    pub fn identity(&self) -> RowIdentity {
        RowIdentity {
            key: self.key.clone(),
            value_type: self.value_type,
        }
    }

    /// Returns whether the editor is open.
    pub fn is_editing(&self) -> bool {
        matches!(self.mode, RowMode::Editing { .. })
    }

    /// Returns the open editor text.
    pub fn editor_buffer(&self) -> Option<&str> {
        match &self.mode {
            RowMode::Editing { buffer } => Some(buffer),
            RowMode::Viewing => None,
        }
    }

    /// Replaces the cached value; returns `true` when the rendered text changed.
    ///
    /// The editor buffer is left untouched.
    pub(crate) fn refresh_value(&mut self, value: StorageValue) -> bool {
        let next_display = display_text(&value);
        let changed = next_display != self.display_text;
        if changed {
            self.display_text = next_display;
            self.edit_text = edit_text(&value);
        }
        self.value = value;
        changed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Summary of one reconciliation pass.
pub struct ReconcileReport {
    /// Rows created.
    pub inserted: usize,
    /// Rows whose text was patched in place.
    pub patched: usize,
    /// Rows removed.
    pub removed: usize,
    /// Editing rows kept although their entry vanished or changed type.
    pub pinned: usize,
    /// Entries not rendered because an open editor still holds their key.
    pub deferred: usize,
    /// Whether the read was superseded by a newer pass and dropped.
    pub discarded: bool,
}

impl ReconcileReport {
    /// Returns whether the pass changed nothing in the view.
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.patched == 0 && self.removed == 0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    row: Option<DisplayedRow>,
}

#[derive(Debug, Clone, Default)]
/// Arena of rendered rows with an identity index and presentation order.
pub struct RowTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: HashMap<RowIdentity, RowHandle>,
    order: Vec<RowHandle>,
}

impl RowTable {
    /// Returns the row behind `handle`.
    pub fn get(&self, handle: RowHandle) -> Option<&DisplayedRow> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.row.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: RowHandle) -> Option<&mut DisplayedRow> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.row.as_mut())
    }

    /// Returns the handle of the row with `identity`.
    pub fn handle_for(&self, identity: &RowIdentity) -> Option<RowHandle> {
        self.index.get(identity).copied()
    }

    /// Returns the handle of the rendered row for `key`.
    pub fn handle_for_key(&self, key: &str) -> Option<RowHandle> {
        self.order
            .iter()
            .copied()
            .find(|handle| self.get(*handle).is_some_and(|row| row.key == key))
    }

    /// Iterates rows in presentation order.
    pub fn rows(&self) -> impl Iterator<Item = (RowHandle, &DisplayedRow)> + '_ {
        self.order
            .iter()
            .filter_map(|handle| self.get(*handle).map(|row| (*handle, row)))
    }

    /// Returns the number of rendered rows.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether no rows are rendered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn position_of(&self, handle: RowHandle) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == handle)
    }

    fn editing_handle_for_key(&self, key: &str) -> Option<RowHandle> {
        self.rows()
            .find(|(_, row)| row.key == key && row.is_editing())
            .map(|(handle, _)| handle)
    }

    fn insert(&mut self, position: usize, row: DisplayedRow) -> RowHandle {
        let identity = row.identity();
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.row = Some(row);
                RowHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    row: Some(row),
                });
                RowHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.index.insert(identity, handle);
        let position = position.min(self.order.len());
        self.order.insert(position, handle);
        handle
    }

    fn remove(&mut self, handle: RowHandle) -> Option<DisplayedRow> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let row = slot.row.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        if self.index.get(&row.identity()) == Some(&handle) {
            self.index.remove(&row.identity());
        }
        self.order.retain(|candidate| *candidate != handle);
        Some(row)
    }

    /// Diffs the rendered rows against `entries` under `filter` and applies the result.
    ///
    /// Returns the view patches describing exactly what changed. Rows in `Editing` mode whose key
    /// still passes the filter are never removed or replaced; their entry is marked stale and any
    /// replacement row for the same key is deferred until the editor closes.
    pub(crate) fn reconcile(
        &mut self,
        entries: &[StorageEntry],
        filter: &KeyFilter,
    ) -> (Vec<ViewPatch>, ReconcileReport) {
        let mut patches = Vec::new();
        let mut report = ReconcileReport::default();

        let visible: Vec<&StorageEntry> = entries
            .iter()
            .filter(|entry| filter.matches(&entry.key))
            .collect();
        let live: HashSet<RowIdentity> = visible.iter().map(|entry| RowIdentity::of(entry)).collect();

        for handle in self.order.clone() {
            let Some(row) = self.get_mut(handle) else {
                continue;
            };
            if live.contains(&row.identity()) {
                continue;
            }
            if row.is_editing() && filter.matches(&row.key) {
                if !row.stale {
                    row.stale = true;
                    report.pinned += 1;
                }
                continue;
            }
            self.remove(handle);
            patches.push(ViewPatch::RemoveRow { handle });
            report.removed += 1;
        }

        let mut anchor: Option<RowHandle> = None;
        for entry in visible {
            let identity = RowIdentity::of(entry);
            if let Some(handle) = self.handle_for(&identity) {
                if let Some(row) = self.get_mut(handle) {
                    row.stale = false;
                    if row.refresh_value(entry.value.clone()) {
                        patches.push(ViewPatch::PatchText {
                            handle,
                            display_text: row.display_text.clone(),
                            edit_text: row.edit_text.clone(),
                        });
                        report.patched += 1;
                    }
                }
                anchor = Some(handle);
                continue;
            }

            if let Some(pinned) = self.editing_handle_for_key(&entry.key) {
                report.deferred += 1;
                anchor = Some(pinned);
                continue;
            }

            let position = anchor
                .and_then(|handle| self.position_of(handle))
                .map_or(0, |position| position + 1);
            let row = DisplayedRow::new(entry);
            let handle = self.insert(position, row.clone());
            patches.push(ViewPatch::InsertRow {
                handle,
                position,
                row,
            });
            report.inserted += 1;
            anchor = Some(handle);
        }

        (patches, report)
    }
}
