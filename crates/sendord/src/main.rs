//! sendord — the file distribution daemon.
//!
//! Runs in one of two modes, selected by the hidden `--task-worker-child`
//! flag:
//!
//! - Normal mode: load config, open the stash, build the task queue and
//!   transfer registry, spawn the age-based eviction and purge tickers,
//!   and serve the HTTP API.
//! - Worker-child mode: read one task's action sequence from stdin, run
//!   it, and stream NDJSON progress to stdout. `sendor-queue::worker`
//!   re-execs this same binary with this flag for every dispatched task,
//!   so a forced kill on timeout or cancellation can never affect any
//!   other task.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sendor_core::SendorConfig;
use sendor_queue::{QueueConfig, TaskQueue};
use sendor_stash::FileStash;
use sendor_transfer::{DistributionRegistry, TargetRegistry};

const WORKER_CHILD_FLAG: &str = "--task-worker-child";

fn main() -> Result<()> {
    if std::env::args().any(|a| a == WORKER_CHILD_FLAG) {
        sendor_queue::child::run();
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run_daemon())
}

async fn run_daemon() -> Result<()> {
    let config = SendorConfig::load()?;
    tracing::info!(
        stash_root = %config.stash.root.display(),
        num_processes = config.queue.num_processes,
        "sendord starting"
    );

    std::fs::create_dir_all(&config.stash.root)?;
    let stash = Arc::new(FileStash::new(&config.stash.root)?);
    let _eviction_thread = sendor_stash::spawn_eviction_thread(
        stash.clone(),
        Duration::from_secs(config.stash.check_interval_seconds),
        chrono::Duration::days(config.stash.max_age_days),
    );

    let queue = TaskQueue::new(QueueConfig {
        num_processes: config.queue.num_processes,
        work_directory: config.queue.work_directory.clone(),
        max_task_execution_time: Duration::from_secs(config.worker.max_task_execution_time_seconds),
        max_task_finalization_time: Duration::from_secs(
            config.worker.max_task_finalization_time_seconds,
        ),
        max_task_wait_seconds: (config.queue.max_task_wait_seconds > 0)
            .then_some(config.queue.max_task_wait_seconds),
        max_task_exist_days: (config.queue.max_task_exist_days > 0)
            .then_some(config.queue.max_task_exist_days),
    })?;
    queue.clone().spawn_purge_ticker(Duration::from_secs(config.queue.cleanup_interval_seconds));

    let targets_path = SendorConfig::file_path().with_file_name("targets.json");
    let targets = match TargetRegistry::load(&targets_path) {
        Ok(targets) => targets,
        Err(err) => {
            tracing::warn!(%err, path = %targets_path.display(), "no targets file; starting with an empty target registry");
            TargetRegistry::empty()
        }
    };

    let incoming_dir = config.queue.work_directory.join("incoming");
    std::fs::create_dir_all(&incoming_dir)?;

    let state = sendor_api::ApiState {
        stash,
        queue,
        registry: Arc::new(DistributionRegistry::new()),
        targets: Arc::new(targets),
        incoming_dir,
    };

    sendor_api::serve(state, config.api.port).await
}
