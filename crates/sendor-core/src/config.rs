//! Configuration for `sendord`.
//!
//! Resolution order: environment variables → config file → built-in
//! defaults.
//!
//! Config file location:
//!   1. `$SENDOR_CONFIG` (explicit override)
//!   2. `$XDG_CONFIG_HOME/sendor/config.toml`
//!   3. `~/.config/sendor/config.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SendorConfig {
    pub stash: StashConfig,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Root directory for the content-addressed blob store and its index.
    pub root: PathBuf,
    pub max_age_days: i64,
    pub check_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Scratch directory under which each task gets its own `work_dir`.
    pub work_directory: PathBuf,
    pub num_processes: usize,
    pub cleanup_interval_seconds: u64,
    /// 0 disables the pending-task timeout.
    pub max_task_wait_seconds: i64,
    /// 0 disables the finished-task purge.
    pub max_task_exist_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub max_task_execution_time_seconds: u64,
    pub max_task_finalization_time_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for SendorConfig {
    fn default() -> Self {
        Self {
            stash: StashConfig::default(),
            queue: QueueConfig::default(),
            worker: WorkerConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            root: data_dir().join("stash"),
            max_age_days: 30,
            check_interval_seconds: 3600,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            work_directory: data_dir().join("work"),
            num_processes: 4,
            cleanup_interval_seconds: 60,
            max_task_wait_seconds: 0,
            max_task_exist_days: 7,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_task_execution_time_seconds: 3600,
            max_task_finalization_time_seconds: 10,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("sendor")
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("sendor")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

impl SendorConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            SendorConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn file_path() -> PathBuf {
        std::env::var("SENDOR_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&SendorConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply `SENDOR_*` env var overrides, using double underscores to
    /// nest into a section (`SENDOR_STASH__ROOT` -> `stash.root`).
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SENDOR_STASH__ROOT") {
            self.stash.root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SENDOR_STASH__MAX_AGE_DAYS") {
            if let Ok(p) = v.parse() {
                self.stash.max_age_days = p;
            }
        }
        if let Ok(v) = std::env::var("SENDOR_QUEUE__NUM_PROCESSES") {
            if let Ok(p) = v.parse() {
                self.queue.num_processes = p;
            }
        }
        if let Ok(v) = std::env::var("SENDOR_QUEUE__WORK_DIRECTORY") {
            self.queue.work_directory = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SENDOR_WORKER__MAX_TASK_EXECUTION_TIME_SECONDS") {
            if let Ok(p) = v.parse() {
                self.worker.max_task_execution_time_seconds = p;
            }
        }
        if let Ok(v) = std::env::var("SENDOR_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_queue_bounds() {
        let config = SendorConfig::default();
        assert_eq!(config.queue.num_processes, 4);
        assert_eq!(config.stash.max_age_days, 30);
    }

    #[test]
    fn write_default_if_missing_creates_file() {
        let tmp = std::env::temp_dir().join(format!("sendor-config-test-{}", std::process::id()));
        let config_path = tmp.join("config.toml");
        std::fs::create_dir_all(&tmp).unwrap();

        unsafe {
            std::env::set_var("SENDOR_CONFIG", config_path.to_str().unwrap());
        }

        let path = SendorConfig::write_default_if_missing().expect("write_default_if_missing failed");
        assert!(path.exists());

        let config = SendorConfig::load().expect("load should succeed");
        assert_eq!(config.api.port, 9090);

        unsafe {
            std::env::remove_var("SENDOR_CONFIG");
        }
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
