//! NDJSON messages a worker child process writes to its stdout, and the
//! JSON the parent writes to its stdin to describe the task to run (spec
//! §4, "Worker"). One message per line; the parent reads with
//! `BufReader::lines`.

use sendor_transfer::ActionSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildInput {
    pub actions: Vec<ActionSpec>,
    pub work_directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Status { state: String },
    Activity { message: String },
    CompletionRatio { ratio: f64 },
    Log { line: String },
    Stdout { line: String },
    TaskDone { success: bool, error: Option<String> },
}
