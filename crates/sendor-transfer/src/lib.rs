//! sendor-transfer — distribution actions and the chunked parallel SFTP
//! upload engine.
//!
//! `ActionSpec` is the serializable vocabulary of steps a [`crate::Task`
//! (sendor-queue)] can run: copy a file locally, probe whether a target
//! already has an up-to-date copy, or push it over SFTP — either as one
//! stream or as `N` chunks pushed in parallel by a bounded thread pool.
//! `execute_action` is the single place that knows how to run each one,
//! shared by in-process tests and the out-of-process worker child.

mod action;
mod chunking;
mod error;
mod registry;
mod sftp;
mod target;
mod targets;

pub use action::{execute_action, probe_up_to_date, ActionContext, ActionSpec, NullActionContext};
pub use chunking::chunk_ranges;
pub use error::TransferError;
pub use registry::{
    create_distribution_actions, register_method, DistributionMethod, DistributionRegistry,
    SourceFile,
};
pub use target::TargetDescriptor;
pub use targets::{NamedTarget, TargetRegistry, TargetsError};
