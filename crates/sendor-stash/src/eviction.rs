use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use crate::store::FileStash;

/// Background age-based eviction loop.
///
/// Every `check_interval` it lists the stash, and removes any entry older
/// than `max_age`. Removal failures (locked entries, races with a
/// concurrent remove) are swallowed — eviction is best-effort and runs
/// again next tick.
pub fn spawn_eviction_thread(
    stash: Arc<FileStash>,
    check_interval: StdDuration,
    max_age: Duration,
) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        std::thread::sleep(check_interval);
        let now = Utc::now();
        for entry in stash.list() {
            let age = now - entry.timestamp;
            if age > max_age {
                if let Err(err) = stash.remove(entry.entry_id) {
                    tracing::trace!(entry_id = %entry.entry_id, %err, "eviction skipped entry");
                }
            }
        }
    })
}
