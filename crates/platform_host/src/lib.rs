//! Typed host-domain contracts for key-value storage inspection.
//!
//! This crate is the API-first boundary for storage services. It exposes the stored-value model,
//! the multi-area [`KeyValueStore`] trait with change notifications, and the host service bundle
//! while concrete browser adapters live in `platform_host_web`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod host;
pub mod storage;

pub use host::{CapabilityError, CapabilityStatus, HostCapabilities, HostServices, HostStrategy};
pub use storage::key_value::{
    ChangeListener, ChangeListeners, ChangeSubscription, KeyValueStore, KeyValueStoreFuture,
    MemoryKeyValueStore, NoopKeyValueStore, StorageAreaName, StorageChange,
};
pub use storage::value::{StorageEntry, StorageValue, StorageValueType};
