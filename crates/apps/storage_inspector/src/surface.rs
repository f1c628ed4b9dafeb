//! Display-surface contract: minimal view patches and the in-memory/no-op surfaces.

use std::{cell::RefCell, rc::Rc};

use platform_host::{StorageAreaName, StorageValueType};

use crate::rows::{DisplayedRow, RowHandle};

/// Duration of the transient highlight shown after a successful boolean toggle.
pub const TOGGLE_PULSE_MS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Static shell content rendered once when an inspector is initialized.
pub struct ShellView {
    /// Bound storage area.
    pub area: StorageAreaName,
    /// Immutable base filter; empty when unset.
    pub base_filter: String,
    /// Optional help text rendered in the footer.
    pub footer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
/// One minimal mutation of the rendered view.
pub enum ViewPatch {
    /// Render the empty shell (filter input, table head, footer).
    MountShell(ShellView),
    /// Create a row element at `position` in presentation order.
    InsertRow {
        /// New row handle.
        handle: RowHandle,
        /// Index among rendered rows.
        position: usize,
        /// Row content.
        row: DisplayedRow,
    },
    /// Replace the value text nodes of an existing row element.
    PatchText {
        /// Target row.
        handle: RowHandle,
        /// New compact text.
        display_text: String,
        /// New editable text.
        edit_text: String,
    },
    /// Remove a row element.
    RemoveRow {
        /// Target row.
        handle: RowHandle,
    },
    /// Swap the display sub-area for a focused editor seeded with `buffer`.
    OpenEditor {
        /// Target row.
        handle: RowHandle,
        /// Initial editor text.
        buffer: String,
    },
    /// Restore the display sub-area.
    CloseEditor {
        /// Target row.
        handle: RowHandle,
    },
    /// Show or clear the inline row error.
    SetRowError {
        /// Target row.
        handle: RowHandle,
        /// Message, or `None` to clear.
        error: Option<String>,
    },
    /// Start the transient "just changed" highlight; the surface clears it after
    /// [`TOGGLE_PULSE_MS`].
    Pulse {
        /// Target row.
        handle: RowHandle,
    },
    /// Show or clear the non-blocking inspector notice.
    SetNotice {
        /// Message, or `None` to clear.
        notice: Option<String>,
    },
}

/// Display surface an inspector renders into.
pub trait InspectorSurface {
    /// Applies one patch. Called only from the inspector's single control flow.
    fn apply(&self, patch: ViewPatch);
}

#[derive(Debug, Clone, PartialEq)]
/// Row element as maintained by [`MemoryInspectorSurface`].
pub struct SurfaceRow {
    /// Row handle.
    pub handle: RowHandle,
    /// Entry key.
    pub key: String,
    /// Value type shown in the type column.
    pub value_type: StorageValueType,
    /// Current compact text.
    pub display_text: String,
    /// Current editable text.
    pub edit_text: String,
    /// Editor content while the editor is open.
    pub editor: Option<String>,
    /// Inline error.
    pub error: Option<String>,
    /// Number of toggle pulses started on this element.
    pub pulses: usize,
}

#[derive(Debug, Default)]
struct SurfaceModel {
    shell: Option<ShellView>,
    rows: Vec<SurfaceRow>,
    notice: Option<String>,
    patches: Vec<ViewPatch>,
}

#[derive(Debug, Clone, Default)]
/// In-memory surface that records every patch and maintains a mirrored element model.
pub struct MemoryInspectorSurface {
    model: Rc<RefCell<SurfaceModel>>,
}

impl MemoryInspectorSurface {
    /// Returns every patch applied so far.
    pub fn patches(&self) -> Vec<ViewPatch> {
        self.model.borrow().patches.clone()
    }

    /// Returns and clears the recorded patches.
    pub fn take_patches(&self) -> Vec<ViewPatch> {
        std::mem::take(&mut self.model.borrow_mut().patches)
    }

    /// Returns the row elements in presentation order.
    pub fn rows(&self) -> Vec<SurfaceRow> {
        self.model.borrow().rows.clone()
    }

    /// Returns the row element for `key`.
    pub fn row_for_key(&self, key: &str) -> Option<SurfaceRow> {
        self.model
            .borrow()
            .rows
            .iter()
            .find(|row| row.key == key)
            .cloned()
    }

    /// Returns the rendered keys in presentation order.
    pub fn keys(&self) -> Vec<String> {
        self.model
            .borrow()
            .rows
            .iter()
            .map(|row| row.key.clone())
            .collect()
    }

    /// Returns the mounted shell.
    pub fn shell(&self) -> Option<ShellView> {
        self.model.borrow().shell.clone()
    }

    /// Returns the current notice.
    pub fn notice(&self) -> Option<String> {
        self.model.borrow().notice.clone()
    }

    fn with_row(model: &mut SurfaceModel, handle: RowHandle, f: impl FnOnce(&mut SurfaceRow)) {
        if let Some(row) = model.rows.iter_mut().find(|row| row.handle == handle) {
            f(row);
        }
    }
}

impl InspectorSurface for MemoryInspectorSurface {
    fn apply(&self, patch: ViewPatch) {
        let mut model = self.model.borrow_mut();
        model.patches.push(patch.clone());
        match patch {
            ViewPatch::MountShell(shell) => model.shell = Some(shell),
            ViewPatch::InsertRow {
                handle,
                position,
                row,
            } => {
                let position = position.min(model.rows.len());
                model.rows.insert(
                    position,
                    SurfaceRow {
                        handle,
                        key: row.key,
                        value_type: row.value_type,
                        display_text: row.display_text,
                        edit_text: row.edit_text,
                        editor: None,
                        error: None,
                        pulses: 0,
                    },
                );
            }
            ViewPatch::PatchText {
                handle,
                display_text,
                edit_text,
            } => Self::with_row(&mut model, handle, |row| {
                row.display_text = display_text;
                row.edit_text = edit_text;
            }),
            ViewPatch::RemoveRow { handle } => model.rows.retain(|row| row.handle != handle),
            ViewPatch::OpenEditor { handle, buffer } => {
                Self::with_row(&mut model, handle, |row| row.editor = Some(buffer))
            }
            ViewPatch::CloseEditor { handle } => {
                Self::with_row(&mut model, handle, |row| row.editor = None)
            }
            ViewPatch::SetRowError { handle, error } => {
                Self::with_row(&mut model, handle, |row| row.error = error)
            }
            ViewPatch::Pulse { handle } => Self::with_row(&mut model, handle, |row| row.pulses += 1),
            ViewPatch::SetNotice { notice } => model.notice = notice,
        }
    }
}
