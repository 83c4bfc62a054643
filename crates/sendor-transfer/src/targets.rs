//! Named target registry.
//!
//! A process-wide, read-only-after-load collection of [`TargetDescriptor`]s
//! keyed by name, resolved when a distribution task is constructed from an
//! HTTP request naming a target by id. Loaded once at startup from a JSON
//! array on disk.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::target::TargetDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum TargetsError {
    #[error("failed to read targets file {0}: {1}")]
    Io(std::path::PathBuf, #[source] std::io::Error),

    #[error("failed to parse targets file {0}: {1}")]
    Parse(std::path::PathBuf, #[source] serde_json::Error),

    #[error("no target named {0}")]
    NotFound(String),
}

/// One entry in the targets file: a [`TargetDescriptor`] plus the
/// distribution method it should be reached with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedTarget {
    #[serde(flatten)]
    pub descriptor: TargetDescriptor,
    pub distribution_method: String,
}

/// A named collection of targets, loaded once at startup and never
/// mutated afterward.
pub struct TargetRegistry {
    targets: HashMap<String, NamedTarget>,
}

impl TargetRegistry {
    pub fn empty() -> Self {
        Self {
            targets: HashMap::new(),
        }
    }

    /// Load a JSON array of [`NamedTarget`]s from `path`.
    pub fn load(path: &Path) -> Result<Self, TargetsError> {
        let bytes = std::fs::read(path).map_err(|e| TargetsError::Io(path.to_path_buf(), e))?;
        let targets: Vec<NamedTarget> =
            serde_json::from_slice(&bytes).map_err(|e| TargetsError::Parse(path.to_path_buf(), e))?;
        Ok(Self {
            targets: targets.into_iter().map(|t| (t.descriptor.name.clone(), t)).collect(),
        })
    }

    pub fn get(&self, name: &str) -> Result<&NamedTarget, TargetsError> {
        self.targets.get(name).ok_or_else(|| TargetsError::NotFound(name.to_string()))
    }

    pub fn list(&self) -> Vec<&NamedTarget> {
        self.targets.values().collect()
    }
}
