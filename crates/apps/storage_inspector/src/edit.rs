//! Keyboard contract for open row editors.

use platform_host::StorageValueType;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Key press as reported by the view layer (`KeyboardEvent.key` plus modifiers).
pub struct KeyPress {
    /// Key name, for example `Enter` or `Escape`.
    pub key: String,
    /// Control modifier.
    pub ctrl: bool,
    /// Meta/command modifier.
    pub meta: bool,
    /// Shift modifier.
    pub shift: bool,
    /// Focus was on another control of the row (for example the Save button), not the editor.
    pub outside_editor: bool,
}

impl KeyPress {
    /// Creates an unmodified key press.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Adds the control modifier.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Adds the meta modifier.
    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// Adds the shift modifier.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Marks the press as coming from a row control other than the editor.
    pub fn outside_editor(mut self) -> Self {
        self.outside_editor = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Edit transition requested by a key press.
pub enum EditKeyAction {
    /// Discard the buffer and close the editor.
    Cancel,
    /// Parse and save the buffer.
    Commit,
}

/// Maps a key press within a row whose editor is open to an edit transition.
///
/// Escape cancels wherever focus is within the row. Enter only acts inside the editor: it
/// commits scalar rows, while object rows keep plain Enter for line breaks and commit on
/// Ctrl+Enter or Meta+Enter.
pub fn key_action(value_type: StorageValueType, press: &KeyPress) -> Option<EditKeyAction> {
    match press.key.as_str() {
        "Escape" | "Esc" => Some(EditKeyAction::Cancel),
        "Enter" if press.outside_editor => None,
        "Enter" => match value_type {
            StorageValueType::Object => {
                (press.ctrl || press.meta).then_some(EditKeyAction::Commit)
            }
            StorageValueType::Boolean => None,
            StorageValueType::Number | StorageValueType::String => Some(EditKeyAction::Commit),
        },
        _ => None,
    }
}
