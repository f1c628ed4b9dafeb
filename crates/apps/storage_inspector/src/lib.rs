//! Storage inspector app: a live, filterable, editable view over one key-value storage area.
//!
//! [`StorageInspector`] owns the row state and talks to the store through
//! [`platform_host::KeyValueStore`]. It renders by emitting minimal [`ViewPatch`]es to an
//! [`InspectorSurface`]; [`InspectorPanel`] is the Leptos component backed by
//! [`SignalSurface`], and [`MemoryInspectorSurface`] records patches for tests and headless hosts.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod canonical;
pub mod edit;
pub mod filter;
pub mod inspector;
pub mod rows;
pub mod surface;
mod view;

pub use canonical::{display_text, edit_text, format_number, parse_edit_text, EditParseError};
pub use edit::{key_action, EditKeyAction, KeyPress};
pub use filter::KeyFilter;
pub use inspector::{InspectorError, InspectorOptions, StorageInspector, TaskSpawner};
pub use rows::{DisplayedRow, ReconcileReport, RowHandle, RowIdentity, RowMode};
pub use surface::{
    InspectorSurface, MemoryInspectorSurface, ShellView, SurfaceRow,
    ViewPatch, TOGGLE_PULSE_MS,
};
pub use view::{InspectorPanel, RowView, SignalSurface};
