//! Storage layer for finvault
//!
//! Provides JSON file storage with atomic writes and the data-store seam the
//! backup pipeline exports from and imports into.

pub mod file_io;
pub mod json_store;
pub mod snapshot;

pub use file_io::{read_json, write_atomic, write_json_atomic};
pub use json_store::{JsonFileStore, Transaction};
pub use snapshot::{InMemorySnapshotStore, Snapshot, SnapshotStore, DOCUMENTS};
