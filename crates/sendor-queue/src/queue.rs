use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sendor_core::{ids::IdGenerator, Observable, TaskId};
use sendor_transfer::ActionSpec;
use tokio::sync::watch;

use crate::error::QueueError;
use crate::task::{Task, TaskProgress};
use crate::worker::{self, TaskOutcome};

#[derive(Debug, Clone, Copy)]
pub enum QueueEvent {
    Added(TaskId),
    Changed(TaskId),
    Removed(TaskId),
}

/// Tuning knobs a `TaskQueue` is built with: admission/dispatch
/// concurrency, worker timeouts, age-based purge.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub num_processes: usize,
    pub work_directory: PathBuf,
    pub max_task_execution_time: Duration,
    pub max_task_finalization_time: Duration,
    /// How long a task may sit in `nonprocessed` before it's auto-canceled.
    pub max_task_wait_seconds: Option<i64>,
    /// How long a finished task stays listable before being purged.
    pub max_task_exist_days: Option<i64>,
}

struct Inner {
    tasks: HashMap<TaskId, Arc<Mutex<Task>>>,
    nonprocessed: VecDeque<TaskId>,
    running: HashMap<TaskId, watch::Sender<bool>>,
}

/// Bounded FIFO task queue with out-of-process dispatch. Admission is
/// unbounded in memory but dispatch is capped
/// at `num_processes` concurrently running workers; everything else waits
/// in `nonprocessed` in arrival order.
pub struct TaskQueue {
    inner: Mutex<Inner>,
    config: QueueConfig,
    ids: IdGenerator,
    pub events: Observable<QueueEvent>,
}

impl TaskQueue {
    pub fn new(config: QueueConfig) -> std::io::Result<Arc<Self>> {
        let _ = std::fs::remove_dir_all(&config.work_directory);
        std::fs::create_dir_all(&config.work_directory)?;

        Ok(Arc::new(Self {
            inner: Mutex::new(Inner {
                tasks: HashMap::new(),
                nonprocessed: VecDeque::new(),
                running: HashMap::new(),
            }),
            config,
            ids: IdGenerator::new(),
            events: Observable::new(),
        }))
    }

    /// Admit a task built from `description` and `actions`. Dispatch runs
    /// immediately if a worker slot is free. Arrival order is preserved
    /// exactly: admission pushes to the back of `nonprocessed` and
    /// dispatch pops from the front.
    pub fn add(self: &Arc<Self>, description: String, actions: Vec<ActionSpec>) -> TaskId {
        let task_id = TaskId::from(self.ids.next());
        let work_dir = self.task_work_directory(task_id);

        let mut task = Task::new(task_id, description, actions);
        task.enqueued(work_dir.display().to_string());
        let handle = Arc::new(Mutex::new(task));

        {
            let mut inner = self.inner.lock().unwrap();
            inner.tasks.insert(task_id, handle);
            inner.nonprocessed.push_back(task_id);
        }
        self.events.notify(&QueueEvent::Added(task_id));
        self.dispatch();
        task_id
    }

    fn task_work_directory(&self, task_id: TaskId) -> PathBuf {
        self.config.work_directory.join(task_id.to_string())
    }

    fn dispatch(self: &Arc<Self>) {
        loop {
            let next = {
                let mut inner = self.inner.lock().unwrap();
                if inner.running.len() < self.config.num_processes {
                    inner.nonprocessed.pop_front()
                } else {
                    None
                }
            };
            let Some(task_id) = next else { break };

            let task_handle = {
                let inner = self.inner.lock().unwrap();
                inner.tasks.get(&task_id).cloned()
            };
            let Some(task_handle) = task_handle else { continue };

            let (cancel_tx, cancel_rx) = watch::channel(false);
            self.inner.lock().unwrap().running.insert(task_id, cancel_tx);

            let work_dir = self.task_work_directory(task_id);
            let max_execution = self.config.max_task_execution_time;
            let max_finalization = self.config.max_task_finalization_time;
            let queue = self.clone();

            tokio::spawn(async move {
                let outcome =
                    worker::run_task(task_handle, work_dir, max_execution, max_finalization, cancel_rx)
                        .await;
                queue.finish_task(task_id, outcome);
            });
        }
    }

    fn finish_task(self: &Arc<Self>, task_id: TaskId, outcome: TaskOutcome) {
        if let Some(task) = self.task_handle(task_id) {
            let mut task = task.lock().unwrap();
            match outcome {
                TaskOutcome::Completed => task.completed(),
                TaskOutcome::Failed(err) => {
                    task.append_log(&err);
                    task.failed();
                }
                TaskOutcome::Canceled => task.canceled(),
            }
        }
        self.inner.lock().unwrap().running.remove(&task_id);
        self.events.notify(&QueueEvent::Changed(task_id));
        self.dispatch();
    }

    /// Cancel a task. Pending tasks are canceled immediately; running
    /// tasks get a cooperative cancel signal that `worker::run_task`
    /// turns into a kill of its child process.
    pub fn cancel(self: &Arc<Self>, task_id: TaskId) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.nonprocessed.iter().any(|id| *id == task_id) {
            inner.nonprocessed.retain(|id| *id != task_id);
            drop(inner);
            if let Some(task) = self.task_handle(task_id) {
                task.lock().unwrap().canceled();
            }
            self.events.notify(&QueueEvent::Changed(task_id));
            return Ok(());
        }

        if let Some(tx) = inner.running.get(&task_id) {
            let _ = tx.send(true);
            return Ok(());
        }

        if inner.tasks.contains_key(&task_id) {
            Err(QueueError::TaskHasCompleted(task_id))
        } else {
            Err(QueueError::TaskNotFound(task_id))
        }
    }

    /// Delete a terminal task from the queue. Fails
    /// with [`QueueError::TaskHasNotCompleted`] if the task is still
    /// pending or running, and [`QueueError::TaskNotFound`] if unknown.
    pub fn remove(&self, task_id: TaskId) -> Result<(), QueueError> {
        {
            let inner = self.inner.lock().unwrap();
            if inner.nonprocessed.iter().any(|id| *id == task_id) || inner.running.contains_key(&task_id)
            {
                return Err(QueueError::TaskHasNotCompleted(task_id));
            }
        }

        let removed = {
            let mut inner = self.inner.lock().unwrap();
            inner.tasks.remove(&task_id)
        };
        if removed.is_none() {
            return Err(QueueError::TaskNotFound(task_id));
        }
        self.events.notify(&QueueEvent::Removed(task_id));
        Ok(())
    }

    fn task_handle(&self, task_id: TaskId) -> Option<Arc<Mutex<Task>>> {
        self.inner.lock().unwrap().tasks.get(&task_id).cloned()
    }

    pub fn get(&self, task_id: TaskId) -> Option<TaskProgress> {
        self.task_handle(task_id).map(|t| t.lock().unwrap().progress())
    }

    pub fn list(&self) -> Vec<TaskProgress> {
        self.inner
            .lock()
            .unwrap()
            .tasks
            .values()
            .map(|t| t.lock().unwrap().progress())
            .collect()
    }

    fn is_pending_or_running(&self, task_id: TaskId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.nonprocessed.iter().any(|id| *id == task_id) || inner.running.contains_key(&task_id)
    }

    /// Poll until `task_id` reaches a terminal state, or is no longer
    /// known to the queue.
    pub async fn join(&self, task_id: TaskId) {
        while self.is_pending_or_running(task_id) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn wait(&self) {
        let ids: Vec<TaskId> = self.inner.lock().unwrap().tasks.keys().copied().collect();
        for id in ids {
            self.join(id).await;
        }
    }

    /// Spawn the background age-based purge loop: every `interval`, auto-cancel tasks
    /// that have waited in `nonprocessed` longer than
    /// `max_task_wait_seconds`, and drop finished tasks older than
    /// `max_task_exist_days` from the listing.
    pub fn spawn_purge_ticker(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.purge();
            }
        })
    }

    fn purge(&self) {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();

        if let Some(max_wait) = self.config.max_task_wait_seconds {
            let stale: Vec<TaskId> = inner
                .nonprocessed
                .iter()
                .copied()
                .filter(|id| {
                    inner
                        .tasks
                        .get(id)
                        .and_then(|t| t.lock().unwrap().enqueue_time)
                        .map(|enqueued| (now - enqueued).num_seconds() > max_wait)
                        .unwrap_or(false)
                })
                .collect();

            for id in &stale {
                inner.nonprocessed.retain(|x| x != id);
                if let Some(task) = inner.tasks.get(id) {
                    task.lock().unwrap().canceled();
                }
            }
            drop(inner);
            for id in stale {
                self.events.notify(&QueueEvent::Changed(id));
            }
            inner = self.inner.lock().unwrap();
        }

        if let Some(max_days) = self.config.max_task_exist_days {
            let max_age_seconds = max_days * 86400;
            inner.tasks.retain(|_, task| {
                let task = task.lock().unwrap();
                match task.end_time {
                    Some(end) => (now - end).num_seconds() < max_age_seconds,
                    None => true,
                }
            });
        }
    }
}
