//! sendor integration test harness.
//!
//! `daemon` spawns the real `sendord` binary against a scratch config and
//! drives it over HTTP exactly as `sendor-ctl` would, minus the
//! network-namespace plumbing this system doesn't need: sendord only
//! ever talks to `127.0.0.1`.
//!
//! `cross_crate` wires `sendor-stash` + `sendor-queue` + `sendor-transfer`
//! together in-process, the way `sendord` itself does, without going
//! through HTTP or a child process — useful for scenarios that don't need
//! a live daemon.
//!
//! Every daemon-based test is serialized behind `DAEMON_LOCK` so they
//! don't race over the same API port.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

mod cross_crate;
mod daemon;

static DAEMON_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
static PORT_COUNTER: AtomicU32 = AtomicU32::new(19090);

fn sendord_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("target/debug/sendord")
}

fn binary_available() -> bool {
    sendord_path().exists()
}

/// A scratch directory tree for one daemon instance: its own stash root,
/// queue work directory, config file, and targets file, all torn down on
/// drop.
struct DaemonFixture {
    root: PathBuf,
    port: u16,
    child: Option<Child>,
}

impl DaemonFixture {
    fn port(&self) -> u16 {
        self.port
    }

    fn cp_target_dir(&self) -> PathBuf {
        self.root.join("cp-landing")
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    async fn wait_ready(&self, max_attempts: u32) -> Result<()> {
        let url = format!("{}/tasks", self.base_url());
        for attempt in 1..=max_attempts {
            if reqwest::get(&url).await.map(|r| r.status().is_success()).unwrap_or(false) {
                return Ok(());
            }
            if attempt < max_attempts {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
        bail!("sendord API on port {} never became ready", self.port)
    }
}

impl Drop for DaemonFixture {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Spawn `sendord` against a freshly generated config rooted at a unique
/// temp directory, with a unique port so parallel test binaries (within
/// the `DAEMON_LOCK`-serialized set, across repeated `cargo test` runs)
/// never collide.
fn spawn_daemon() -> Result<DaemonFixture> {
    let id = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
    let root = std::env::temp_dir().join(format!("sendor-it-{}-{}", std::process::id(), id));
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(&root)?;
    std::fs::create_dir_all(root.join("cp-landing"))?;

    let port = id as u16;
    let config_path = root.join("config.toml");
    let config = format!(
        r#"
[stash]
root = "{stash_root}"
max_age_days = 30
check_interval_seconds = 3600

[queue]
work_directory = "{work_dir}"
num_processes = 2
cleanup_interval_seconds = 3600
max_task_wait_seconds = 0
max_task_exist_days = 7

[worker]
max_task_execution_time_seconds = 30
max_task_finalization_time_seconds = 5

[api]
port = {port}
"#,
        stash_root = root.join("stash").display(),
        work_dir = root.join("work").display(),
    );
    std::fs::write(&config_path, config)?;
    std::fs::create_dir_all(root.join("stash"))?;

    let targets = serde_json::json!([
        {
            "name": "local",
            "directory": root.join("cp-landing").display().to_string(),
            "distribution_method": "cp",
        }
    ]);
    std::fs::write(config_path.with_file_name("targets.json"), targets.to_string())?;

    let child = Command::new(sendord_path())
        .env("SENDOR_CONFIG", &config_path)
        .env("RUST_LOG", "info")
        .spawn()
        .context("failed to spawn sendord")?;

    Ok(DaemonFixture { root, port, child: Some(child) })
}

async fn api_get(fixture: &DaemonFixture, path: &str) -> Result<Value> {
    let url = format!("{}{}", fixture.base_url(), path);
    reqwest::get(&url).await?.json().await.with_context(|| format!("GET {path}"))
}

async fn api_post(fixture: &DaemonFixture, path: &str, body: Option<Value>) -> Result<Value> {
    let url = format!("{}{}", fixture.base_url(), path);
    let client = reqwest::Client::new();
    let request = match body {
        Some(b) => client.post(&url).json(&b),
        None => client.post(&url),
    };
    let resp = request.send().await?;
    if !resp.status().is_success() {
        bail!("POST {path} failed: {}", resp.status());
    }
    if resp.content_length() == Some(0) {
        return Ok(Value::Null);
    }
    resp.json().await.with_context(|| format!("POST {path}"))
}

/// Upload `bytes` as `filename` and return the stash entry JSON.
async fn api_upload(fixture: &DaemonFixture, filename: &str, bytes: Vec<u8>) -> Result<Value> {
    let url = format!("{}/stash", fixture.base_url());
    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);
    let resp = reqwest::Client::new().post(&url).multipart(form).send().await?;
    if !resp.status().is_success() {
        bail!("upload failed: {}", resp.status());
    }
    resp.json().await.context("parsing upload response")
}

/// Poll `/tasks/{id}` until it reaches a terminal state or `max_attempts`
/// is exhausted.
async fn wait_for_task_terminal(fixture: &DaemonFixture, task_id: u64, max_attempts: u32) -> Result<Value> {
    for attempt in 1..=max_attempts {
        let task = api_get(fixture, &format!("/tasks/{task_id}")).await?;
        let state = task["state"].as_str().unwrap_or("");
        if matches!(state, "completed" | "failed" | "canceled") {
            return Ok(task);
        }
        if attempt < max_attempts {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
    bail!("task {task_id} did not reach a terminal state in time")
}
