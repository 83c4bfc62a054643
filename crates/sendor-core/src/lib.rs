//! sendor-core — shared types used by every other sendor crate.
//!
//! Provides the `Observable` pub/sub bus, monotonic id
//! newtypes, task-progress duration formatting, and the
//! `{task_work_directory}` path placeholder substitution used by
//! `ActionContext::translate_path`.

pub mod config;
pub mod duration;
pub mod ids;
pub mod observable;
pub mod path;

pub use config::SendorConfig;
pub use duration::format_duration;
pub use ids::{EntryId, TaskId};
pub use observable::Observable;
pub use path::translate_path;
