use serde::{Deserialize, Serialize};

/// A distribution target machine, addressed over SSH/SFTP.
///
/// `directory` only matters to [`crate::ActionSpec::CopyFile`] via the
/// `cp` method — the local-filesystem destination directory, distinct
/// from `name` (the target's display name used in log markers and
/// task descriptions). `chunk_size` and `max_parallel_transfers` only
/// matter to [`crate::ActionSpec::ParallelSftpPut`] — they set how many
/// chunks a large file is split into and how many of them are in
/// flight at once. Only fields required by the chosen method need be
/// present: every field but `name`/`host` defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub private_key_file: String,
    #[serde(default)]
    pub directory: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_max_parallel_transfers")]
    pub max_parallel_transfers: usize,
}

fn default_chunk_size() -> u64 {
    1024 * 1024
}

fn default_max_parallel_transfers() -> usize {
    4
}
