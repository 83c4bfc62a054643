use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use sendor_core::{ids::IdGenerator, EntryId, Observable};
use sha1::{Digest, Sha1};

use crate::entry::{PhysicalBlob, StashEntry, StashEntryFields, StashEvent};
use crate::error::StashError;

const INDEX_FILENAME: &str = "index.json";

struct Inner {
    physical_blobs: HashMap<String, PhysicalBlob>,
    stashed_files: HashMap<EntryId, StashEntry>,
    /// Per-entry advisory lock counters. Kept apart from
    /// `PhysicalBlob::reference_count`, which tracks how many entries
    /// *exist* for a blob, not how many of them are locked.
    lock_counts: HashMap<EntryId, i64>,
}

/// Content-addressed file store.
///
/// Files are ingested by content hash under `root_path`; the same content
/// ingested twice shares one on-disk blob, refcounted by the
/// [`StashEntry`] references that point at it. The index is durable JSON,
/// rebuilt from the on-disk tree at startup so a crash never leaves
/// orphaned blobs or index entries pointing at missing files.
pub struct FileStash {
    root_path: PathBuf,
    inner: Mutex<Inner>,
    ids: IdGenerator,
    pub events: Observable<StashEvent>,
}

impl FileStash {
    /// Open (or initialize) a stash rooted at `root_path`. The directory
    /// must already exist.
    pub fn new(root_path: impl Into<PathBuf>) -> Result<Self, StashError> {
        let root_path = root_path.into();
        if !root_path.exists() {
            return Err(StashError::Io {
                path: root_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "stash directory does not exist",
                ),
            });
        }

        let stash = Self {
            root_path,
            inner: Mutex::new(Inner {
                physical_blobs: HashMap::new(),
                stashed_files: HashMap::new(),
                lock_counts: HashMap::new(),
            }),
            ids: IdGenerator::new(),
            events: Observable::new(),
        };
        stash.build_index()?;
        Ok(stash)
    }

    fn index_path(&self) -> PathBuf {
        self.root_path.join(INDEX_FILENAME)
    }

    /// Reconcile the on-disk index against the on-disk blob tree: drop
    /// index entries whose blob is missing, delete blobs no entry
    /// references, remove stray subdirectories, then rebuild the in-memory
    /// tables and resave. Run once at startup.
    fn build_index(&self) -> Result<(), StashError> {
        // `index.json` is a mapping `entry_id -> { original_filename,
        // sha1sum, timestamp, size }`. Old keys aren't reused on rebuild (see
        // below), so only the values are read back here.
        let old_index: HashMap<String, StashEntryFields> = match fs::read(self.index_path()) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(_) => HashMap::new(),
        };

        let mut on_disk_files = Vec::new();
        for entry in fs::read_dir(&self.root_path).map_err(|e| self.io_err(e))? {
            let entry = entry.map_err(|e| self.io_err(e))?;
            let path = entry.path();
            if path.is_dir() {
                let _ = fs::remove_dir_all(&path);
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name != INDEX_FILENAME {
                    on_disk_files.push(name.to_string());
                }
            }
        }

        let live_index: Vec<StashEntryFields> = old_index
            .into_values()
            .filter(|e| on_disk_files.contains(&e.sha1sum))
            .collect();

        let referenced: std::collections::HashSet<&str> =
            live_index.iter().map(|e| e.sha1sum.as_str()).collect();
        for file in &on_disk_files {
            if !referenced.contains(file.as_str()) {
                let _ = fs::remove_file(self.root_path.join(file));
            }
        }

        {
            let mut inner = self.inner.lock().unwrap();
            inner.physical_blobs.clear();
            inner.stashed_files.clear();
            inner.lock_counts.clear();
            for entry in live_index {
                // Ids are reassigned on rebuild, not preserved from the old
                // index — they're a process-lifetime counter, not a durable
                // key.
                let size: u64 = entry.size.parse().unwrap_or(0);
                self.add_to_index_locked(
                    &mut inner,
                    entry.original_filename,
                    entry.sha1sum,
                    entry.timestamp,
                    size,
                )?;
            }
        }

        self.save_index()
    }

    fn io_err(&self, source: std::io::Error) -> StashError {
        StashError::Io {
            path: self.root_path.clone(),
            source,
        }
    }

    /// Flush the index while already holding `inner`'s lock — used by
    /// `ingest`/`remove` so the in-memory mutation, the on-disk blob
    /// move/delete, and the flush all happen under one held guard.
    fn save_index_locked(&self, inner: &Inner) -> Result<(), StashError> {
        let entries: HashMap<String, StashEntryFields> = inner
            .stashed_files
            .values()
            .map(|entry| (entry.entry_id.to_string(), entry.to_json()))
            .collect();

        let path = self.index_path();
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path).map_err(|e| self.io_err(e))?;
            let json = serde_json::to_vec_pretty(&entries)?;
            file.write_all(&json).map_err(|e| self.io_err(e))?;
            file.sync_all().map_err(|e| self.io_err(e))?;
        }
        fs::rename(&tmp_path, &path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn save_index(&self) -> Result<(), StashError> {
        let inner = self.inner.lock().unwrap();
        self.save_index_locked(&inner)
    }

    fn add_to_index_locked(
        &self,
        inner: &mut Inner,
        filename: String,
        sha1sum: String,
        timestamp: DateTime<Utc>,
        size: u64,
    ) -> Result<StashEntry, StashError> {
        if !inner.physical_blobs.contains_key(&sha1sum) {
            inner
                .physical_blobs
                .insert(sha1sum.clone(), PhysicalBlob::new(sha1sum.clone())?);
        }
        inner.physical_blobs.get(&sha1sum).unwrap().add_ref();

        let entry_id = EntryId::from(self.ids.next());
        let entry = StashEntry {
            entry_id,
            root_path: self.root_path.clone(),
            original_filename: filename,
            sha1sum,
            timestamp,
            size,
        };
        inner.stashed_files.insert(entry_id, entry.clone());
        inner.lock_counts.insert(entry_id, 0);
        Ok(entry)
    }

    fn remove_from_index_locked(
        &self,
        inner: &mut Inner,
        entry_id: EntryId,
    ) -> Result<(StashEntry, bool), StashError> {
        let entry = inner
            .stashed_files
            .remove(&entry_id)
            .ok_or(StashError::EntryDoesNotExist(entry_id))?;
        inner.lock_counts.remove(&entry_id);
        let remaining = inner
            .physical_blobs
            .get(&entry.sha1sum)
            .map(|b| b.rem_ref())
            .unwrap_or(0);
        if remaining <= 0 {
            inner.physical_blobs.remove(&entry.sha1sum);
        }
        Ok((entry, remaining <= 0))
    }

    /// Hash and ingest `original_path/filename` into the stash. If this
    /// content is already stored under another entry, the source file is
    /// deleted rather than duplicated on disk; otherwise it is moved in.
    ///
    /// The in-memory insert, the on-disk blob move/delete, and the index
    /// flush all happen under one held lock, so a concurrent `remove` or
    /// eviction tick can never observe (or act on) a half-finished ingest —
    /// one where the index claims a blob that hasn't been moved into place
    /// yet, or a flush that races ahead of the move.
    pub fn ingest(
        &self,
        original_path: &Path,
        filename: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<StashEntry, StashError> {
        let original_file = original_path.join(filename);
        let sha1sum = sha1_file(&original_file).map_err(|e| self.io_err(e))?;
        let size = fs::metadata(&original_file).map_err(|e| self.io_err(e))?.len();

        let entry = {
            let mut inner = self.inner.lock().unwrap();
            let entry =
                self.add_to_index_locked(&mut inner, filename.to_string(), sha1sum, timestamp, size)?;

            let full_path = entry.full_path();
            let move_result = if full_path.exists() {
                fs::remove_file(&original_file).map_err(|e| self.io_err(e))
            } else {
                fs::rename(&original_file, &full_path).map_err(|e| self.io_err(e))
            };
            if let Err(err) = move_result {
                let _ = self.remove_from_index_locked(&mut inner, entry.entry_id);
                return Err(err);
            }

            self.save_index_locked(&inner)?;
            entry
        };

        self.events.notify(&StashEvent::Added(entry.clone()));
        Ok(entry)
    }

    /// Remove an entry from the index and, if it held the last reference
    /// to its blob, delete the blob from disk. The existence/lock check,
    /// the in-memory removal, the blob deletion, and the index flush all
    /// happen under one held lock.
    pub fn remove(&self, entry_id: EntryId) -> Result<(), StashError> {
        let entry = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.stashed_files.contains_key(&entry_id) {
                return Err(StashError::EntryDoesNotExist(entry_id));
            }
            let lock_count = inner.lock_counts.get(&entry_id).copied().unwrap_or(0);
            if lock_count != 0 {
                return Err(StashError::EntryLocked(entry_id));
            }

            let (entry, should_delete_blob) = self.remove_from_index_locked(&mut inner, entry_id)?;
            if should_delete_blob {
                let _ = fs::remove_file(entry.full_path());
            }
            self.save_index_locked(&inner)?;
            entry
        };

        self.events.notify(&StashEvent::Removed(entry));
        Ok(())
    }

    /// Best-effort removal of every entry with a zero refcount; used both
    /// for administrative cleanup and by the age-based eviction loop.
    pub fn remove_all_unlocked_files(&self) {
        let ids: Vec<EntryId> = {
            let inner = self.inner.lock().unwrap();
            inner.stashed_files.keys().copied().collect()
        };
        for id in ids {
            let _ = self.remove(id);
        }
    }

    pub fn list(&self) -> Vec<StashEntry> {
        self.inner.lock().unwrap().stashed_files.values().cloned().collect()
    }

    pub fn get(&self, entry_id: EntryId) -> Option<StashEntry> {
        self.inner.lock().unwrap().stashed_files.get(&entry_id).cloned()
    }

    /// Advisory-lock an entry against removal. Does not touch the blob's
    /// refcount — that tracks how many entries reference the blob, not how
    /// many hold a lock.
    pub fn lock(&self, entry_id: EntryId) -> Result<StashEntry, StashError> {
        let entry = {
            let mut inner = self.inner.lock().unwrap();
            let entry = inner
                .stashed_files
                .get(&entry_id)
                .cloned()
                .ok_or(StashError::EntryDoesNotExist(entry_id))?;
            *inner.lock_counts.entry(entry_id).or_insert(0) += 1;
            entry
        };
        self.events.notify(&StashEvent::Changed(entry.clone()));
        Ok(entry)
    }

    /// Release one lock taken via [`FileStash::lock`] on `entry_id`.
    pub fn unlock(&self, entry_id: EntryId) -> Result<(), StashError> {
        let entry = {
            let mut inner = self.inner.lock().unwrap();
            let entry = inner
                .stashed_files
                .get(&entry_id)
                .cloned()
                .ok_or(StashError::EntryDoesNotExist(entry_id))?;
            let count = inner.lock_counts.entry(entry_id).or_insert(0);
            *count = (*count - 1).max(0);
            entry
        };
        self.events.notify(&StashEvent::Changed(entry.clone()));
        Ok(())
    }
}

fn sha1_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
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
