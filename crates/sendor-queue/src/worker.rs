//! The parent side of out-of-process task execution.
//!
//! Each dispatched task gets its own child process — `sendord` re-exec'd
//! with the hidden `--task-worker-child` flag — rather than a shared
//! pool, so a forced kill on timeout or cancellation can never affect any
//! other task. The child's NDJSON stdout is the only channel back; stdin
//! carries the task's action sequence once, at startup.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

use crate::message::{ChildInput, WorkerMessage};
use crate::task::Task;

pub enum TaskOutcome {
    Completed,
    Failed(String),
    Canceled,
}

/// Run one task's action sequence out-of-process, mutating `task` as
/// progress messages arrive. `cancel_rx` fires when
/// [`crate::TaskQueue::cancel`] is called for this task while it's
/// running; `max_execution`/`max_finalization` bound, respectively, how
/// long the child gets to run and how long it gets to exit gracefully
/// after being asked to stop before a forced kill.
///
/// `work_dir` is created before dispatch and removed here on every exit
/// path, including ones where the child never spawned — matching the
/// "created on start and removed on exit" guarantee every task's scratch
/// directory carries.
pub async fn run_task(
    task: Arc<Mutex<Task>>,
    work_dir: PathBuf,
    max_execution: Duration,
    max_finalization: Duration,
    cancel_rx: watch::Receiver<bool>,
) -> TaskOutcome {
    let outcome = execute(&task, &work_dir, max_execution, max_finalization, cancel_rx).await;
    let _ = std::fs::remove_dir_all(&work_dir);
    outcome
}

async fn execute(
    task: &Arc<Mutex<Task>>,
    work_dir: &PathBuf,
    max_execution: Duration,
    max_finalization: Duration,
    mut cancel_rx: watch::Receiver<bool>,
) -> TaskOutcome {
    let actions = task.lock().unwrap().actions.clone();
    let child_input = ChildInput {
        actions,
        work_directory: Some(work_dir.display().to_string()),
    };

    if let Err(err) = std::fs::create_dir_all(work_dir) {
        return TaskOutcome::Failed(format!("failed to create task work directory: {err}"));
    }

    let current_exe = match std::env::current_exe() {
        Ok(p) => p,
        Err(err) => return TaskOutcome::Failed(format!("failed to locate own executable: {err}")),
    };

    let mut child = match Command::new(current_exe)
        .arg("--task-worker-child")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(c) => c,
        Err(err) => return TaskOutcome::Failed(format!("failed to spawn worker process: {err}")),
    };

    if let Some(mut stdin) = child.stdin.take() {
        let payload = serde_json::to_vec(&child_input).unwrap_or_default();
        let _ = stdin.write_all(&payload).await;
        let _ = stdin.shutdown().await;
    }

    task.lock().unwrap().started();

    let stdout = child.stdout.take().expect("stdout was piped");
    let mut lines = BufReader::new(stdout).lines();

    let mut success = false;
    let mut error_message: Option<String> = None;
    let mut task_done_seen = false;

    let read_messages = async {
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(message) = serde_json::from_str::<WorkerMessage>(&line) else {
                continue;
            };
            apply_message(task, message, &mut success, &mut error_message, &mut task_done_seen);
            if task_done_seen {
                break;
            }
        }
    };

    let outcome = tokio::select! {
        _ = read_messages => None,
        _ = tokio::time::sleep(max_execution) => {
            Some(TaskOutcome::Failed("task exceeded its maximum execution time".to_string()))
        }
        _ = wait_for_cancel(&mut cancel_rx) => {
            Some(TaskOutcome::Canceled)
        }
    };

    if let Some(outcome) = outcome {
        let _ = child.start_kill();
        finalize_child(&mut child, max_finalization).await;
        return outcome;
    }

    finalize_child(&mut child, max_finalization).await;

    if success && task_done_seen {
        TaskOutcome::Completed
    } else {
        TaskOutcome::Failed(error_message.unwrap_or_else(|| "worker exited without reporting completion".to_string()))
    }
}

async fn wait_for_cancel(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            // sender dropped without ever cancelling: never resolve, let
            // the other select! branches decide the task's fate.
            std::future::pending::<()>().await;
        }
    }
}

async fn finalize_child(child: &mut tokio::process::Child, max_finalization: Duration) {
    if tokio::time::timeout(max_finalization, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

fn apply_message(
    task: &Arc<Mutex<Task>>,
    message: WorkerMessage,
    success: &mut bool,
    error_message: &mut Option<String>,
    task_done_seen: &mut bool,
) {
    let mut task = task.lock().unwrap();
    match message {
        WorkerMessage::Status { .. } => {}
        WorkerMessage::Activity { message } => task.activity = message,
        WorkerMessage::CompletionRatio { ratio } => task.completion_ratio = ratio,
        WorkerMessage::Log { line } => task.append_log(&line),
        WorkerMessage::Stdout { line } => task.append_log(&line),
        WorkerMessage::TaskDone { success: s, error } => {
            *success = s;
            *error_message = error;
            *task_done_seen = true;
        }
    }
}
