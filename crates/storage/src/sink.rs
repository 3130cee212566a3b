// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence sink: keyed round-snapshot storage.

use crate::snapshot::{RoundSnapshot, SnapshotError};
use rup_core::RoundId;
use std::path::{Path, PathBuf};

/// Keyed store for round snapshots.
///
/// One entry per round id. `write` atomically replaces any prior snapshot;
/// `list_ids` enumerates persisted rounds for restart recovery.
pub trait RoundSink: Send + Sync + 'static {
    /// Read the snapshot for a round, if one was persisted.
    fn read(&self, id: &RoundId) -> Result<Option<RoundSnapshot>, SnapshotError>;

    /// Atomically replace the snapshot for a round.
    fn write(&self, snapshot: &RoundSnapshot) -> Result<(), SnapshotError>;

    /// Remove the snapshot for a round. Removing an absent entry is a no-op.
    fn delete(&self, id: &RoundId) -> Result<(), SnapshotError>;

    /// Ids of every persisted round.
    fn list_ids(&self) -> Result<Vec<RoundId>, SnapshotError>;
}

/// Filesystem sink: one `<roundId>.json` file per round in a flat directory.
#[derive(Debug, Clone)]
pub struct FsRoundSink {
    dir: PathBuf,
}

impl FsRoundSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &RoundId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl RoundSink for FsRoundSink {
    fn read(&self, id: &RoundId) -> Result<Option<RoundSnapshot>, SnapshotError> {
        RoundSnapshot::load(&self.path_for(id))
    }

    fn write(&self, snapshot: &RoundSnapshot) -> Result<(), SnapshotError> {
        snapshot.save(&self.path_for(&snapshot.metadata.id))
    }

    fn delete(&self, id: &RoundId) -> Result<(), SnapshotError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_ids(&self) -> Result<Vec<RoundId>, SnapshotError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(RoundId::new(stem));
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }
}

/// In-memory sink for tests.
///
/// Write and read failures can be injected to exercise the engine's
/// persistence-failure policy (round stays hot and dirty).
#[cfg(any(test, feature = "test-support"))]
pub use fake::MemorySink;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct MemorySinkState {
        entries: BTreeMap<String, RoundSnapshot>,
    }

    /// In-memory [`RoundSink`] with injectable failures.
    #[derive(Clone, Default)]
    pub struct MemorySink {
        inner: Arc<Mutex<MemorySinkState>>,
        fail_writes: Arc<AtomicBool>,
        fail_reads: Arc<AtomicBool>,
        write_count: Arc<AtomicUsize>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent writes fail with an IO error.
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Make subsequent reads fail with an IO error.
        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        /// Number of successful writes so far.
        pub fn write_count(&self) -> usize {
            self.write_count.load(Ordering::SeqCst)
        }

        /// Snapshot currently stored for a round, if any.
        pub fn get(&self, id: &RoundId) -> Option<RoundSnapshot> {
            self.inner.lock().entries.get(id.as_str()).cloned()
        }

        /// Number of stored snapshots.
        pub fn len(&self) -> usize {
            self.inner.lock().entries.len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn injected_error() -> SnapshotError {
            SnapshotError::Io(std::io::Error::other("injected sink failure"))
        }
    }

    impl RoundSink for MemorySink {
        fn read(&self, id: &RoundId) -> Result<Option<RoundSnapshot>, SnapshotError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(Self::injected_error());
            }
            Ok(self.inner.lock().entries.get(id.as_str()).cloned())
        }

        fn write(&self, snapshot: &RoundSnapshot) -> Result<(), SnapshotError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::injected_error());
            }
            self.inner
                .lock()
                .entries
                .insert(snapshot.metadata.id.to_string(), snapshot.clone());
            self.write_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn delete(&self, id: &RoundId) -> Result<(), SnapshotError> {
            self.inner.lock().entries.remove(id.as_str());
            Ok(())
        }

        fn list_ids(&self) -> Result<Vec<RoundId>, SnapshotError> {
            Ok(self
                .inner
                .lock()
                .entries
                .keys()
                .map(|k| RoundId::new(k.clone()))
                .collect())
        }
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
