//! Blocking SSH/SFTP plumbing, grounded on `ssh2`'s synchronous API.
//!
//! `ssh2::Session` is neither `Send` across an async runtime nor cheap to
//! share, so every connection here is opened on the thread that uses it —
//! one for a single-stream put or a remote probe, one per worker thread
//! for a parallel put.

use std::io::{Read, Seek, SeekFrom, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha1::{Digest, Sha1};
use ssh2::Session;

use crate::error::TransferError;
use crate::target::TargetDescriptor;

const BLOCK_SIZE: usize = 16384;

pub fn connect(target: &TargetDescriptor) -> Result<Session, TransferError> {
    let addr = format!("{}:{}", target.host, target.port);
    let stream = TcpStream::connect(&addr).map_err(|source| TransferError::Connect {
        host: target.host.clone(),
        port: target.port,
        source,
    })?;

    let mut session = Session::new()?;
    session.set_tcp_stream(stream);
    session.handshake()?;
    session.userauth_pubkey_file(
        &target.user,
        None,
        Path::new(&target.private_key_file),
        None,
    )?;
    Ok(session)
}

/// Run `command` on the target and return its stdout, trimmed. A nonzero
/// exit status is surfaced as [`TransferError::RemoteCommand`].
pub fn exec_remote(session: &Session, command: &str) -> Result<String, TransferError> {
    let mut channel = session.channel_session()?;
    channel.exec(command)?;

    let mut stdout = String::new();
    channel.read_to_string(&mut stdout)?;
    let mut stderr = String::new();
    channel.stderr().read_to_string(&mut stderr)?;

    channel.wait_close()?;
    let status = channel.exit_status()?;
    if status != 0 {
        return Err(TransferError::RemoteCommand {
            command: command.to_string(),
            stderr,
        });
    }
    Ok(stdout.trim().to_string())
}

/// SHA-1 of a remote file via `sha1sum -b`, or `None` if the probe fails
/// (missing file, unreadable, connection hiccup) — callers treat that the
/// same as "not up to date" rather than propagating the error.
pub fn remote_sha1(session: &Session, remote_path: &str) -> Option<String> {
    let output = exec_remote(session, &format!("sha1sum -b {remote_path}")).ok()?;
    output.split_whitespace().next().map(|s| s.to_string())
}

/// Push `source` to `remote_path` as one stream, reporting progress via
/// `on_progress(transferred, total)` after every block.
pub fn put_single_stream(
    session: &Session,
    source: &Path,
    remote_path: &str,
    total_size: u64,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<(), TransferError> {
    let mut input = std::fs::File::open(source)?;
    let sftp = session.sftp()?;
    let mut remote = sftp.open_mode(
        Path::new(remote_path),
        ssh2::OpenFlags::WRITE | ssh2::OpenFlags::CREATE | ssh2::OpenFlags::TRUNCATE,
        0o644,
        ssh2::OpenType::File,
    )?;

    let mut buf = [0u8; BLOCK_SIZE];
    let mut transferred = 0u64;
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        remote.write_all(&buf[..n])?;
        transferred += n as u64;
        on_progress(transferred, total_size);
    }
    Ok(())
}

/// Push one byte range `[offset, offset+length)` of `source` into an
/// already-`truncate`d remote file, via an SFTP handle opened for
/// read+write on this call's own session.
fn put_chunk(
    session: &Session,
    source: &Path,
    remote_path: &str,
    offset: u64,
    length: u64,
    transmitted: &Arc<AtomicU64>,
    total_size: u64,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<(), TransferError> {
    let sftp = session.sftp()?;
    let mut input = std::fs::File::open(source)?;
    input.seek(SeekFrom::Start(offset))?;

    let mut remote = sftp.open_mode(
        Path::new(remote_path),
        ssh2::OpenFlags::WRITE,
        0o644,
        ssh2::OpenType::File,
    )?;
    remote.seek(SeekFrom::Start(offset))?;

    let mut buf = [0u8; BLOCK_SIZE];
    let mut sent = 0u64;
    while sent < length {
        let want = std::cmp::min(BLOCK_SIZE as u64, length - sent) as usize;
        let n = input.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        remote.write_all(&buf[..n])?;
        sent += n as u64;

        let total_transmitted = transmitted.fetch_add(n as u64, Ordering::SeqCst) + n as u64;
        on_progress(total_transmitted, total_size);
    }
    Ok(())
}

/// Push `source` to `remote_path` as `chunks` parallel ranges, using up to
/// `max_parallel_transfers` worker threads each with its own SSH session.
/// The remote file is pre-truncated to `total_size` before any chunk is
/// sent.
pub fn put_parallel(
    target: &TargetDescriptor,
    source: &Path,
    remote_path: &str,
    total_size: u64,
    chunks: Vec<(u64, u64)>,
    max_parallel_transfers: usize,
    mut on_progress: impl FnMut(u64, u64) + Send + 'static,
) -> Result<(), TransferError> {
    let probe = connect(target)?;
    exec_remote(&probe, &format!("truncate -s {total_size} {remote_path}"))?;
    drop(probe);

    let transmitted = Arc::new(AtomicU64::new(0));
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(u64, u64)>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<Result<(), String>>();

    for (offset, length) in chunks {
        job_tx.send((offset, length)).expect("receivers outlive senders");
    }
    drop(job_tx);

    let progress_for_workers: Arc<std::sync::Mutex<Box<dyn FnMut(u64, u64) + Send>>> =
        Arc::new(std::sync::Mutex::new(Box::new(move |done, total| on_progress(done, total))));

    std::thread::scope(|scope| {
        let worker_count = max_parallel_transfers.max(1);
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let transmitted = transmitted.clone();
            let progress = progress_for_workers.clone();
            let source = source.to_path_buf();

            scope.spawn(move || {
                let session = match connect(target) {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = result_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                for (offset, length) in job_rx.iter() {
                    let report = |done: u64, total: u64| {
                        let mut cb = progress.lock().unwrap();
                        cb(done, total);
                    };
                    let outcome = put_chunk(
                        &session,
                        &source,
                        remote_path,
                        offset,
                        length,
                        &transmitted,
                        total_size,
                        report,
                    );
                    if let Err(e) = outcome {
                        let _ = result_tx.send(Err(e.to_string()));
                        return;
                    }
                }
                let _ = result_tx.send(Ok(()));
            });
        }
    });
    drop(result_tx);

    let failures: Vec<String> = result_rx.iter().filter_map(|r| r.err()).collect();
    if !failures.is_empty() {
        return Err(TransferError::ChunkTransferFailed(failures.join("; ")));
    }
    Ok(())
}

pub fn sha1_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
