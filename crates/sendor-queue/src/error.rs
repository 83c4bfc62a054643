use sendor_core::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("task {0} does not exist in the queue")]
    TaskNotFound(TaskId),

    #[error("task {0} has already completed execution")]
    TaskHasCompleted(TaskId),

    #[error("task {0} has not yet completed execution")]
    TaskHasNotCompleted(TaskId),
}
