//! /stash handlers — ingest, list, lock/unlock, remove.
//!
//! Upload handling (multipart field parsing, size limits, filename
//! sanitisation) is trimmed to the one responsibility this layer needs:
//! land bytes on disk and hand them to the stash.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sendor_core::EntryId;
use serde::Serialize;

use super::ApiState;

const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

#[derive(Serialize)]
pub struct StashEntryResponse {
    pub entry_id: u64,
    pub original_filename: String,
    pub sha1sum: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub size: u64,
}

fn to_response(entry: &sendor_stash::StashEntry) -> StashEntryResponse {
    StashEntryResponse {
        entry_id: entry.entry_id.0,
        original_filename: entry.original_filename.clone(),
        sha1sum: entry.sha1sum.clone(),
        timestamp: entry.timestamp,
        size: entry.size,
    }
}

pub async fn handle_list(State(state): State<ApiState>) -> Json<Vec<StashEntryResponse>> {
    Json(state.stash.list().iter().map(to_response).collect())
}

pub async fn handle_get(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<StashEntryResponse>, (StatusCode, String)> {
    state
        .stash
        .get(EntryId::from(id))
        .map(|e| Json(to_response(&e)))
        .ok_or((StatusCode::NOT_FOUND, format!("entry {id} not found")))
}

/// Accept a single-field multipart upload (`file`), write it under
/// `incoming_dir`, and ingest it into the stash.
pub async fn handle_ingest(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<StashEntryResponse>, (StatusCode, String)> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if let Some(name) = field.file_name() {
            filename = sanitize_filename(name);
        }
        let data = field.bytes().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        if file_data.len() + data.len() > MAX_UPLOAD_BYTES {
            return Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("file exceeds {MAX_UPLOAD_BYTES} byte limit"),
            ));
        }
        file_data.extend_from_slice(&data);
    }

    if filename.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "no file field in upload".to_string()));
    }

    std::fs::create_dir_all(&state.incoming_dir)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    std::fs::write(state.incoming_dir.join(&filename), &file_data)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let entry = state
        .stash
        .ingest(&state.incoming_dir, &filename, Utc::now())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(entry_id = %entry.entry_id, filename, "ingested upload into stash");
    Ok(Json(to_response(&entry)))
}

pub async fn handle_remove(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .stash
        .remove(EntryId::from(id))
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::CONFLICT, e.to_string()))
}

pub async fn handle_lock(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<StashEntryResponse>, (StatusCode, String)> {
    state
        .stash
        .lock(EntryId::from(id))
        .map(|e| Json(to_response(&e)))
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

pub async fn handle_unlock(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .stash
        .unlock(EntryId::from(id))
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let trimmed = base.trim_start_matches('.');
    let clean: String = trimmed
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if clean.is_empty() {
        "uploaded_file".to_string()
    } else {
        clean
    }
}
