//! sendor-queue — the `Task`/`Action` data model, the bounded FIFO
//! `TaskQueue`, and the out-of-process `Worker`.
//!
//! Each admitted task is dispatched to its own child process (the
//! `sendord` binary re-exec'd with a hidden worker-child flag) once a
//! `num_processes` slot frees up; `worker::run_task` is the parent side
//! of that dispatch, `child::run` is the entry point the child process
//! runs.

pub mod child;
mod error;
mod message;
mod queue;
mod task;
mod worker;

pub use error::QueueError;
pub use message::{ChildInput, WorkerMessage};
pub use queue::{QueueConfig, QueueEvent, TaskQueue};
pub use task::{Task, TaskProgress, TaskState};
