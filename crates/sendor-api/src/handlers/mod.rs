//! HTTP API handlers — exposes the stash and task queue as JSON.

pub mod stash;
pub mod tasks;

use std::path::PathBuf;
use std::sync::Arc;

use sendor_queue::TaskQueue;
use sendor_stash::FileStash;
use sendor_transfer::{DistributionRegistry, TargetRegistry};

#[derive(Clone)]
pub struct ApiState {
    pub stash: Arc<FileStash>,
    pub queue: Arc<TaskQueue>,
    pub registry: Arc<DistributionRegistry>,
    pub targets: Arc<TargetRegistry>,
    /// Scratch directory uploaded bytes land in before being handed to
    /// `FileStash::ingest`, which moves (or deletes, on dedup) them.
    pub incoming_dir: PathBuf,
}
