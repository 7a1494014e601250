//! Local artifact store
//!
//! Filesystem-backed persistence of generated binaries and their JSON
//! metadata sidecars, keyed by artifact id.

pub mod store;

pub use store::{ArtifactStore, StoreError, StoreResult};
