//! The worker child process: reads a task's action sequence
//! from stdin, runs it in-process (the child itself, not a thread of the
//! daemon), and streams progress to stdout as NDJSON. Invoked by
//! `sendord`'s hidden `--task-worker-child` mode; see `sendor-queue`'s
//! `worker` module for the parent side.

use std::io::{Read, Write};

use sendor_transfer::{execute_action, probe_up_to_date, ActionContext, ActionSpec};

use crate::message::{ChildInput, WorkerMessage};

struct ChildContext {
    work_directory: Option<String>,
}

impl ChildContext {
    fn emit(&self, message: WorkerMessage) {
        if let Ok(line) = serde_json::to_string(&message) {
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "{line}");
            let _ = stdout.flush();
        }
    }
}

impl ActionContext for ChildContext {
    fn work_directory(&self) -> Option<&str> {
        self.work_directory.as_deref()
    }

    fn activity(&mut self, message: &str) {
        self.emit(WorkerMessage::Activity {
            message: message.to_string(),
        });
    }

    fn completion_ratio(&mut self, ratio: f64) {
        self.emit(WorkerMessage::CompletionRatio { ratio });
    }

    fn log(&mut self, message: &str) {
        self.emit(WorkerMessage::Log {
            line: message.to_string(),
        });
    }
}

/// Entry point for the `--task-worker-child` process. Never returns:
/// exits 0 on success, 1 on action failure, matching the parent's use of
/// exit status as a coarse secondary success signal alongside `TaskDone`.
pub fn run() -> ! {
    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("failed to read task from stdin: {err}");
        std::process::exit(2);
    }

    let child_input: ChildInput = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(err) => {
            eprintln!("failed to parse task: {err}");
            std::process::exit(2);
        }
    };

    let mut context = ChildContext {
        work_directory: child_input.work_directory,
    };
    context.emit(WorkerMessage::Status {
        state: "in_progress".to_string(),
    });

    let mut up_to_date = false;
    let mut error: Option<String> = None;

    for action in &child_input.actions {
        if let ActionSpec::ProbeUpToDate {
            target,
            remote_path,
            expected_sha1,
        } = action
        {
            up_to_date = probe_up_to_date(target, remote_path, expected_sha1, &mut context);
            continue;
        }

        if let Err(err) = execute_action(action, &mut context, up_to_date) {
            error = Some(err.to_string());
            break;
        }
    }

    let success = error.is_none();
    context.emit(WorkerMessage::TaskDone {
        success,
        error,
    });
    std::process::exit(if success { 0 } else { 1 });
}
