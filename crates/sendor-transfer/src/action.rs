//! The action vocabulary a task's action sequence is built from, and the
//! single dispatcher (`execute_action`) that knows how to run each one.
//! Kept serializable so a `Task`'s actions can cross the process
//! boundary into the out-of-process worker child unchanged.

use std::path::PathBuf;

use sendor_core::translate_path;
use serde::{Deserialize, Serialize};

use crate::chunking::{chunk_ranges, num_chunks};
use crate::error::TransferError;
use crate::sftp;
use crate::target::TargetDescriptor;

/// Callbacks an [`ActionSpec`] uses to report progress back to whatever is
/// driving it — a `Task` in-process, or an out-of-process worker's NDJSON
/// writer.
pub trait ActionContext {
    fn work_directory(&self) -> Option<&str>;
    fn activity(&mut self, message: &str);
    fn completion_ratio(&mut self, ratio: f64);
    fn log(&mut self, message: &str);

    fn translate(&self, path: &str) -> String {
        translate_path(path, self.work_directory())
    }
}

/// An [`ActionContext`] that discards everything — useful for tests that
/// only care whether an action completed.
#[derive(Default)]
pub struct NullActionContext {
    pub work_directory: Option<String>,
    pub up_to_date: Option<bool>,
}

impl ActionContext for NullActionContext {
    fn work_directory(&self) -> Option<&str> {
        self.work_directory.as_deref()
    }
    fn activity(&mut self, _message: &str) {}
    fn completion_ratio(&mut self, _ratio: f64) {}
    fn log(&mut self, _message: &str) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionSpec {
    /// Emit a log line noting the start or end of a distribution.
    LogMarker { message: String },

    CopyFile { source: String, target: String },

    /// Probe whether `target` already has `expected_sha1` at
    /// `remote_path`; a positive result makes the next `SftpPut` /
    /// `ParallelSftpPut` in the same task a no-op.
    ProbeUpToDate {
        target: TargetDescriptor,
        remote_path: String,
        expected_sha1: String,
    },

    SftpPut {
        source: String,
        target: TargetDescriptor,
        remote_path: String,
        sha1sum: String,
        size: u64,
    },

    ParallelSftpPut {
        source: String,
        target: TargetDescriptor,
        remote_path: String,
        sha1sum: String,
        size: u64,
    },
}

/// Run a single action against `context`. The up-to-date flag a
/// `ProbeUpToDate` sets is carried by the caller across actions in the same
/// task (see `sendor-queue`'s `Task::run`), not by this function.
pub fn execute_action(
    spec: &ActionSpec,
    context: &mut dyn ActionContext,
    up_to_date: bool,
) -> Result<(), TransferError> {
    match spec {
        ActionSpec::LogMarker { message } => {
            context.log(message);
            Ok(())
        }

        ActionSpec::CopyFile { source, target } => {
            context.activity("Copying file");
            let source = context.translate(source);
            let target = context.translate(target);
            std::fs::copy(&source, &target)?;
            context.activity("Copy completed");
            Ok(())
        }

        ActionSpec::ProbeUpToDate { .. } => {
            // Handled specially by the caller, which needs the resulting
            // flag to decide whether to run the next action at all; see
            // `probe_up_to_date`.
            Ok(())
        }

        ActionSpec::SftpPut {
            source,
            target,
            remote_path,
            sha1sum,
            size,
        } => {
            if up_to_date {
                context.activity("Remote file is up-to-date; skipping transfer");
                return Ok(());
            }
            let source_path = PathBuf::from(context.translate(source));
            context.activity("Connecting to SSH server");
            let session = sftp::connect(target)?;
            context.activity("Transferring file via SFTP");
            sftp::put_single_stream(&session, &source_path, remote_path, *size, |done, total| {
                context.completion_ratio(done as f64 / total as f64);
            })?;

            context.activity("Validating file integrity");
            verify_and_cleanup_on_mismatch(&session, remote_path, sha1sum)?;
            context.activity("Transfer complete");
            Ok(())
        }

        ActionSpec::ParallelSftpPut {
            source,
            target,
            remote_path,
            sha1sum,
            size,
        } => {
            if up_to_date {
                context.activity("Remote file is up-to-date; skipping transfer");
                return Ok(());
            }
            let source_path = PathBuf::from(context.translate(source));
            let chunks = chunk_ranges(*size, num_chunks(*size, target.chunk_size));

            context.activity("Connecting to SSH server");
            context.activity("Transferring chunks using SFTP");

            // completion_ratio callbacks arrive on worker threads; route
            // them through a channel so `context` (single-threaded) only
            // ever sees them from this thread.
            let (tx, rx) = std::sync::mpsc::channel::<(u64, u64)>();
            let size = *size;
            let handle = std::thread::spawn({
                let target = target.clone();
                let remote_path = remote_path.clone();
                move || {
                    sftp::put_parallel(
                        &target,
                        &source_path,
                        &remote_path,
                        size,
                        chunks,
                        target.max_parallel_transfers,
                        move |done, total| {
                            let _ = tx.send((done, total));
                        },
                    )
                }
            });
            for (done, total) in rx {
                context.completion_ratio(done as f64 / total as f64);
            }
            handle.join().expect("chunk transfer thread panicked")?;

            context.activity("Validating file integrity");
            let session = sftp::connect(target)?;
            // Cleans up the remote file on mismatch, same as the
            // single-stream path.
            verify_and_cleanup_on_mismatch(&session, remote_path, sha1sum)?;
            context.activity("Transfer complete");
            Ok(())
        }
    }
}

/// Run `ProbeUpToDate` outside `execute_action`'s match so its boolean
/// result can influence whether the task's next action runs at all.
pub fn probe_up_to_date(
    target: &TargetDescriptor,
    remote_path: &str,
    expected_sha1: &str,
    context: &mut dyn ActionContext,
) -> bool {
    context.activity("Connecting to SSH server");
    let Ok(session) = sftp::connect(target) else {
        context.activity("Remote file is not up-to-date");
        return false;
    };
    context.activity("Checking if remote file already is up-to-date");
    match sftp::remote_sha1(&session, remote_path) {
        Some(actual) if actual == expected_sha1 => {
            context.activity("Remote file is up-to-date; skipping transfer");
            true
        }
        _ => {
            context.activity("Remote file is not up-to-date");
            false
        }
    }
}

fn verify_and_cleanup_on_mismatch(
    session: &ssh2::Session,
    remote_path: &str,
    expected_sha1: &str,
) -> Result<(), TransferError> {
    let actual = sftp::remote_sha1(session, remote_path).unwrap_or_default();
    if actual != expected_sha1 {
        if let Err(err) = sftp::exec_remote(session, &format!("rm {remote_path}")) {
            tracing::warn!(%err, remote_path, "failed to clean up corrupted partial transfer");
        }
        return Err(TransferError::IntegrityMismatch {
            expected: expected_sha1.to_string(),
            actual,
        });
    }
    Ok(())
}
