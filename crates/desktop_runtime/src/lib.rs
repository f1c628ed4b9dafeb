//! Host shell runtime for the storage inspector.
//!
//! Owns the display surfaces (tabs and a single popup) that inspectors are mounted in, the pure
//! surface reducer, launch configuration parsing, and the Leptos components that render the desk.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod components;
pub mod config;
mod host;
pub mod model;
pub mod reducer;

pub use components::{use_host_shell, HostShellProvider, SurfaceDesk};
pub use config::{current_inspector_config, parse_inspector_config_from_query, InspectorConfig};
pub use host::{HostShell, HostShellError, InspectorSession};
pub use model::*;
pub use reducer::{reduce_surfaces, ReducerError, SurfaceAction, SurfaceEffect};
