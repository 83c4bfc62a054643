//! /tasks, /targets handlers — admit, inspect, cancel and remove
//! distribution tasks, and list the configured delivery targets.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sendor_core::{EntryId, TaskId};
use sendor_transfer::SourceFile;
use serde::{Deserialize, Serialize};

use super::ApiState;

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub entry_id: u64,
    pub target: String,
    /// Overrides the target's configured distribution method if set.
    pub method: Option<String>,
}

#[derive(Serialize)]
pub struct CreateTaskResponse {
    pub task_id: u64,
}

pub async fn handle_create_task(
    State(state): State<ApiState>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<Json<CreateTaskResponse>, (StatusCode, String)> {
    let entry_id = EntryId::from(request.entry_id);

    let named_target = state
        .targets
        .get(&request.target)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?
        .clone();
    let method = request.method.as_deref().unwrap_or(&named_target.distribution_method);

    let entry = state
        .stash
        .lock(entry_id)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;

    let source = SourceFile {
        local_path: entry.full_path().display().to_string(),
        filename: entry.original_filename.clone(),
        sha1sum: entry.sha1sum.clone(),
        size: entry.size,
    };

    let actions = state
        .registry
        .create_distribution_actions(method, &source, &named_target.descriptor)
        .map_err(|e| {
            let _ = state.stash.unlock(entry_id);
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    let description = format!("distribute {} to {}", entry.original_filename, named_target.descriptor.name);
    let task_id = state.queue.add(description, actions);

    // The lock taken above is released once the task leaves the queue's
    // running set, whichever way it resolved.
    let queue = state.queue.clone();
    let stash = state.stash.clone();
    tokio::spawn(async move {
        queue.join(task_id).await;
        if let Err(err) = stash.unlock(entry_id) {
            tracing::warn!(%err, %entry_id, "failed to release stash lock after task completion");
        }
    });

    Ok(Json(CreateTaskResponse { task_id: task_id.0 }))
}

pub async fn handle_list_tasks(State(state): State<ApiState>) -> Json<Vec<sendor_queue::TaskProgress>> {
    Json(state.queue.list())
}

pub async fn handle_get_task(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<sendor_queue::TaskProgress>, (StatusCode, String)> {
    state
        .queue
        .get(TaskId::from(id))
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("task {id} not found")))
}

pub async fn handle_cancel_task(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .queue
        .cancel(TaskId::from(id))
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::CONFLICT, e.to_string()))
}

pub async fn handle_remove_task(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .queue
        .remove(TaskId::from(id))
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::CONFLICT, e.to_string()))
}

#[derive(Serialize)]
pub struct TargetResponse {
    pub name: String,
    pub host: String,
    pub distribution_method: String,
}

pub async fn handle_list_targets(State(state): State<ApiState>) -> Json<Vec<TargetResponse>> {
    Json(
        state
            .targets
            .list()
            .into_iter()
            .map(|t| TargetResponse {
                name: t.descriptor.name.clone(),
                host: t.descriptor.host.clone(),
                distribution_method: t.distribution_method.clone(),
            })
            .collect(),
    )
}
