//! `Task` — one admission to the queue and its action sequence. State
//! only ever moves forward: `NotStarted -> Started ->
//! {Completed | Failed | Canceled}`.

use chrono::{DateTime, Utc};
use sendor_core::{format_duration, TaskId};
use sendor_transfer::ActionSpec;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskState {
    NotStarted,
    Started,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::NotStarted => "not_started",
            TaskState::Started => "in_progress",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        }
    }
}

/// The wire shape of a task's progress — what `GET` task-status
/// endpoints and `sendor-ctl status` render.
#[derive(Debug, Clone, Serialize)]
pub struct TaskProgress {
    pub task_id: TaskId,
    pub description: String,
    pub enqueue_time: Option<String>,
    pub duration: Option<String>,
    pub state: String,
    pub activity: String,
    pub completion_ratio: f64,
    pub is_cancelable: bool,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: TaskId,
    pub description: String,
    pub actions: Vec<ActionSpec>,
    pub work_directory: Option<String>,
    pub state: TaskState,
    pub enqueue_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub completion_ratio: f64,
    pub activity: String,
    pub log: String,
    pub is_cancelable: bool,
}

impl Task {
    pub fn new(task_id: TaskId, description: String, actions: Vec<ActionSpec>) -> Self {
        Self {
            task_id,
            description,
            actions,
            work_directory: None,
            state: TaskState::NotStarted,
            enqueue_time: None,
            start_time: None,
            end_time: None,
            completion_ratio: 0.0,
            activity: String::new(),
            log: String::new(),
            is_cancelable: false,
        }
    }

    pub fn enqueued(&mut self, work_directory: String) {
        self.work_directory = Some(work_directory);
        self.enqueue_time = Some(Utc::now());
        self.is_cancelable = true;
    }

    pub fn started(&mut self) {
        self.state = TaskState::Started;
        self.start_time = Some(Utc::now());
    }

    pub fn completed(&mut self) {
        self.state = TaskState::Completed;
        self.end_time = Some(Utc::now());
        self.is_cancelable = false;
    }

    pub fn failed(&mut self) {
        self.state = TaskState::Failed;
        self.end_time = Some(Utc::now());
        self.is_cancelable = false;
    }

    pub fn canceled(&mut self) {
        self.state = TaskState::Canceled;
        self.end_time = Some(Utc::now());
        self.is_cancelable = false;
    }

    pub fn append_log(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    pub fn progress(&self) -> TaskProgress {
        let duration = self.start_time.map(|start| {
            let end = self.end_time.unwrap_or_else(Utc::now);
            format_duration(end - start)
        });

        TaskProgress {
            task_id: self.task_id,
            description: self.description.clone(),
            enqueue_time: self.enqueue_time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
            duration,
            state: self.state.as_str().to_string(),
            activity: self.activity.clone(),
            completion_ratio: self.completion_ratio,
            is_cancelable: self.is_cancelable,
            log: self.log.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_has_no_duration_before_start() {
        let task = Task::new(TaskId::from(1), "test".to_string(), vec![]);
        assert_eq!(task.progress().duration, None);
        assert_eq!(task.progress().state, "not_started");
    }

    #[test]
    fn progress_reports_duration_after_completion() {
        let mut task = Task::new(TaskId::from(1), "test".to_string(), vec![]);
        task.started();
        task.completed();
        assert!(task.progress().duration.is_some());
        assert_eq!(task.progress().state, "completed");
    }
}
