//! In-process wiring of `sendor-stash` + `sendor-queue` + `sendor-transfer`,
//! the same composition `sendord` itself performs (minus the HTTP layer
//! and the out-of-process worker child — these tests run actions
//! in-process via `sendor_transfer::execute_action` directly so they don't
//! depend on a built `sendord` binary being on disk).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sendor_stash::FileStash;
use sendor_transfer::{
    execute_action, probe_up_to_date, ActionSpec, DistributionRegistry, NullActionContext,
    SourceFile, TargetDescriptor,
};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn scratch_dir(label: &str) -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "sendor-crosscrate-{}-{}-{}",
        label,
        std::process::id(),
        id
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) {
    std::fs::write(dir.join(name), contents).unwrap();
}

fn cp_target(directory: &Path) -> TargetDescriptor {
    TargetDescriptor {
        name: "local".to_string(),
        host: String::new(),
        port: 0,
        user: String::new(),
        private_key_file: String::new(),
        directory: directory.display().to_string(),
        chunk_size: 1024 * 1024,
        max_parallel_transfers: 1,
    }
}

/// Run an action sequence synchronously in-process, the same way
/// `sendor-queue::child::run` does for a single action list, and return
/// whether any action failed.
fn run_actions(actions: &[ActionSpec], work_dir: Option<&str>) -> Result<(), String> {
    let mut context = NullActionContext {
        work_directory: work_dir.map(str::to_string),
        up_to_date: None,
    };
    let mut up_to_date = false;
    for action in actions {
        if let ActionSpec::ProbeUpToDate { target, remote_path, expected_sha1 } = action {
            up_to_date = probe_up_to_date(target, remote_path, expected_sha1, &mut context);
            continue;
        }
        execute_action(action, &mut context, up_to_date).map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[test]
fn stash_lock_distribute_unlock_round_trip() {
    let stash_dir = scratch_dir("stash");
    let source_dir = scratch_dir("source");
    let landing_dir = scratch_dir("landing");
    write_file(&source_dir, "release.tar.gz", b"the release bytes\n");

    let stash = FileStash::new(&stash_dir).unwrap();
    let entry = stash.ingest(&source_dir, "release.tar.gz", Utc::now()).unwrap();

    // Lock before building the distribution task, exactly as the API
    // layer's `handle_create_task` does.
    stash.lock(entry.entry_id).unwrap();
    assert!(matches!(stash.remove(entry.entry_id), Err(sendor_stash::StashError::EntryLocked(_))));

    let source = SourceFile {
        local_path: entry.full_path().display().to_string(),
        filename: entry.original_filename.clone(),
        sha1sum: entry.sha1sum.clone(),
        size: entry.size,
    };
    let registry = DistributionRegistry::new();
    let target = cp_target(&landing_dir);
    let actions = registry.create_distribution_actions("cp", &source, &target).unwrap();

    run_actions(&actions, None).expect("cp distribution should succeed");
    assert_eq!(
        std::fs::read(landing_dir.join("release.tar.gz")).unwrap(),
        b"the release bytes\n"
    );

    stash.unlock(entry.entry_id).unwrap();
    stash.remove(entry.entry_id).unwrap();
    assert!(stash.get(entry.entry_id).is_none());
}

#[test]
fn shared_blob_sibling_stays_removable_while_other_is_locked_for_distribution() {
    // Dedup scenario composed with a lock taken for an in-flight
    // distribution task on the sibling entry.
    let stash_dir = scratch_dir("dedup-stash");
    let source_dir = scratch_dir("dedup-source");
    write_file(&source_dir, "a.bin", b"identical payload\n");
    write_file(&source_dir, "b.bin", b"identical payload\n");

    let stash = FileStash::new(&stash_dir).unwrap();
    let a = stash.ingest(&source_dir, "a.bin", Utc::now()).unwrap();
    let b = stash.ingest(&source_dir, "b.bin", Utc::now()).unwrap();
    assert_eq!(a.sha1sum, b.sha1sum);

    stash.lock(a.entry_id).unwrap();
    stash.remove(b.entry_id).unwrap();
    assert!(a.full_path().exists(), "blob must survive while a's entry still references it");

    assert!(matches!(stash.remove(a.entry_id), Err(sendor_stash::StashError::EntryLocked(_))));
    stash.unlock(a.entry_id).unwrap();
    stash.remove(a.entry_id).unwrap();
    assert!(!a.full_path().exists());
}

#[test]
fn stash_backed_cp_distribution_runs_to_completion_while_entry_is_locked() {
    let stash_dir = scratch_dir("queue-stash");
    let source_dir = scratch_dir("queue-source");
    let landing_dir = scratch_dir("queue-landing");
    write_file(&source_dir, "payload.bin", b"payload for the queue\n");

    let stash = FileStash::new(&stash_dir).unwrap();
    let entry = stash.ingest(&source_dir, "payload.bin", Utc::now()).unwrap();
    stash.lock(entry.entry_id).unwrap();

    let source = SourceFile {
        local_path: entry.full_path().display().to_string(),
        filename: entry.original_filename.clone(),
        sha1sum: entry.sha1sum.clone(),
        size: entry.size,
    };
    let registry = DistributionRegistry::new();
    let target = cp_target(&landing_dir);
    let actions = registry.create_distribution_actions("cp", &source, &target).unwrap();

    // `sendord` itself hands this same action list to `sendor-queue::worker`,
    // which re-execs the daemon binary with `--task-worker-child` to run it
    // out-of-process — see `daemon.rs` for that full path. Here the actions
    // run in-process, exactly as `sendor-queue::child::run` runs them inside
    // that child, to prove the list `create_distribution_actions` built is
    // runnable end to end independent of the re-exec plumbing, while the
    // stash entry stays locked for the duration the way a real task holds it.
    run_actions(&actions, None).expect("cp distribution should succeed");
    assert_eq!(
        std::fs::read(landing_dir.join("payload.bin")).unwrap(),
        b"payload for the queue\n"
    );

    assert!(matches!(stash.remove(entry.entry_id), Err(sendor_stash::StashError::EntryLocked(_))));
    stash.unlock(entry.entry_id).unwrap();
    stash.remove(entry.entry_id).unwrap();
}
