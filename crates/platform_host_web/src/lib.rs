//! Browser (`wasm32`) implementations of [`platform_host`] storage contracts.
//!
//! This crate is the concrete browser-side host wiring layer: a Web Storage backed
//! [`platform_host::KeyValueStore`] and the compile-time host strategy selection that assembles
//! [`platform_host::HostServices`] for the runtime.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

/// Compile-time host-strategy selection and concrete adapter factories for runtime wiring.
pub mod adapters;
pub mod storage;

pub use adapters::{
    build_host_services, host_capabilities, host_strategy_name, key_value_store,
    selected_host_strategy, KeyValueStoreAdapter,
};
pub use storage::web_storage::{decode_stored_text, encode_stored_value, WebKeyValueStore};
