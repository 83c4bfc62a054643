use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use sendor_core::EntryId;
use serde::{Deserialize, Serialize};

use crate::error::StashError;

/// A SHA-1 content hash, refcounted across every [`StashEntry`] that shares
/// the same on-disk blob.
#[derive(Debug)]
pub struct PhysicalBlob {
    pub sha1sum: String,
    reference_count: AtomicI64,
}

impl PhysicalBlob {
    pub fn new(sha1sum: impl Into<String>) -> Result<Self, StashError> {
        let sha1sum = sha1sum.into();
        if sha1sum.len() != 40 {
            return Err(StashError::InvalidHash(sha1sum));
        }
        Ok(Self {
            sha1sum,
            reference_count: AtomicI64::new(0),
        })
    }

    pub fn add_ref(&self) -> i64 {
        self.reference_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn rem_ref(&self) -> i64 {
        self.reference_count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn ref_count(&self) -> i64 {
        self.reference_count.load(Ordering::SeqCst)
    }
}

/// One entry in the stash index: a named, timestamped reference to a
/// [`PhysicalBlob`]. Several entries may point at the same blob (same
/// content, different `original_filename` or ingest time).
#[derive(Debug, Clone)]
pub struct StashEntry {
    pub entry_id: EntryId,
    pub root_path: PathBuf,
    pub original_filename: String,
    pub sha1sum: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

impl StashEntry {
    pub fn full_path(&self) -> PathBuf {
        self.root_path.join(&self.sha1sum)
    }

    /// The value side of the `index.json` mapping; `entry_id` is the map
    /// *key*, not a field of the value.
    pub fn to_json(&self) -> StashEntryFields {
        StashEntryFields {
            original_filename: self.original_filename.clone(),
            sha1sum: self.sha1sum.clone(),
            timestamp: self.timestamp,
            // Stored as a string in the on-disk index.
            size: self.size.to_string(),
        }
    }
}

/// Wire/index representation of one `index.json` value:
/// `{ original_filename, sha1sum, timestamp, size }`, keyed by `entry_id`
/// in the surrounding map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StashEntryFields {
    pub original_filename: String,
    pub sha1sum: String,
    pub timestamp: DateTime<Utc>,
    pub size: String,
}

/// Events published on the stash's [`sendor_core::Observable`] bus.
#[derive(Debug, Clone)]
pub enum StashEvent {
    Added(StashEntry),
    Removed(StashEntry),
    Changed(StashEntry),
}
