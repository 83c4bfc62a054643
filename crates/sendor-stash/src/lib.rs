//! sendor-stash — content-addressed file store.
//!
//! Ingested files are hashed with SHA-1 and kept on disk under their hash,
//! refcounted so the same content can be referenced by more than one
//! [`StashEntry`] without being duplicated on disk. The index is persisted
//! as JSON alongside the blobs and reconciled against the on-disk tree at
//! startup, so a crash never leaves an entry pointing at a missing blob.

mod entry;
mod error;
mod eviction;
mod store;

pub use entry::{PhysicalBlob, StashEntry, StashEvent};
pub use error::StashError;
pub use eviction::spawn_eviction_thread;
pub use store::FileStash;
