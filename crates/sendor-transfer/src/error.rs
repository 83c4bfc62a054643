#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("ssh handshake or authentication failed: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("remote command failed: {command}: {stderr}")]
    RemoteCommand { command: String, stderr: String },

    #[error("file corrupted during transfer: expected sha1 {expected}, target reports {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("one or more parallel chunk transfers failed: {0}")]
    ChunkTransferFailed(String),

    #[error("unknown distribution method: {0}")]
    UnknownMethod(String),
}
