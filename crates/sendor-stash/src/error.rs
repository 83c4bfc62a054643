use sendor_core::EntryId;

#[derive(Debug, thiserror::Error)]
pub enum StashError {
    #[error("{0} is not a valid SHA1 hash value")]
    InvalidHash(String),

    #[error("entry {0} does not exist in the file stash")]
    EntryDoesNotExist(EntryId),

    #[error("entry {0} is locked and cannot be removed")]
    EntryLocked(EntryId),

    #[error("io error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index file: {0}")]
    CorruptIndex(#[from] serde_json::Error),
}
