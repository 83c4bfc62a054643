//! `tasks`/`distribute` subcommands — admit, inspect, cancel, remove.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, delete, get_json, post_json_body, post_no_body};

#[derive(Deserialize)]
struct TaskProgress {
    task_id: u64,
    description: String,
    state: String,
    activity: String,
    completion_ratio: f64,
    duration: Option<String>,
    is_cancelable: bool,
}

#[derive(Serialize)]
struct CreateTaskRequest<'a> {
    entry_id: u64,
    target: &'a str,
    method: Option<&'a str>,
}

#[derive(Deserialize)]
struct CreateTaskResponse {
    task_id: u64,
}

#[derive(Deserialize)]
struct TargetInfo {
    name: String,
    host: String,
    distribution_method: String,
}

pub async fn cmd_targets_list(port: u16) -> Result<()> {
    let targets: Vec<TargetInfo> = get_json(&format!("{}/targets", base_url(port))).await?;

    if targets.is_empty() {
        println!("No targets configured.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Targets ({})", targets.len());
    println!("═══════════════════════════════════════");
    for t in &targets {
        println!("  ┌─ {}", t.name);
        println!("  │  host   : {}", t.host);
        println!("  └─ method : {}", t.distribution_method);
    }
    Ok(())
}

pub async fn cmd_distribute(port: u16, entry_id: &str, target: &str, method: Option<&str>) -> Result<()> {
    let entry_id: u64 = entry_id.parse()?;
    let request = CreateTaskRequest { entry_id, target, method };
    let resp: CreateTaskResponse =
        post_json_body(&format!("{}/tasks", base_url(port)), &request).await?;
    println!("Admitted task #{}.", resp.task_id);
    Ok(())
}

pub async fn cmd_tasks_list(port: u16) -> Result<()> {
    let tasks: Vec<TaskProgress> = get_json(&format!("{}/tasks", base_url(port))).await?;

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Tasks ({})", tasks.len());
    println!("═══════════════════════════════════════");
    for t in &tasks {
        println!("  ┌─ #{} {}", t.task_id, t.description);
        println!("  │  state      : {}", t.state);
        println!("  │  activity   : {}", t.activity);
        println!("  │  progress   : {:.0}%", t.completion_ratio * 100.0);
        if let Some(duration) = &t.duration {
            println!("  │  duration   : {duration}");
        }
        println!("  └─ cancelable : {}", t.is_cancelable);
    }
    Ok(())
}

pub async fn cmd_tasks_get(port: u16, task_id: &str) -> Result<()> {
    let t: TaskProgress = get_json(&format!("{}/tasks/{}", base_url(port), task_id)).await?;
    println!("Task #{} — {}", t.task_id, t.description);
    println!("  state      : {}", t.state);
    println!("  activity   : {}", t.activity);
    println!("  progress   : {:.0}%", t.completion_ratio * 100.0);
    Ok(())
}

pub async fn cmd_tasks_cancel(port: u16, task_id: &str) -> Result<()> {
    post_no_body(&format!("{}/tasks/{}/cancel", base_url(port), task_id)).await?;
    println!("Canceled task {task_id}.");
    Ok(())
}

pub async fn cmd_tasks_remove(port: u16, task_id: &str) -> Result<()> {
    delete(&format!("{}/tasks/{}", base_url(port), task_id)).await?;
    println!("Removed task {task_id}.");
    Ok(())
}
