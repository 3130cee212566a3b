// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod enqueue;
mod lease;
mod listing;
mod report;
mod snapshot;
mod stats;
mod sweep;

use super::*;
use rup_core::SequentialIdGen;

pub(super) const NOW: u64 = 1_000_000;

pub(super) fn store() -> (RoundStore, SequentialIdGen, NodeStatsStore) {
    (
        RoundStore::new(RoundId::new("round_0001")),
        SequentialIdGen::new("t"),
        NodeStatsStore::new(),
    )
}

/// Enqueue paths and return the new ids.
pub(super) fn enqueue_all(
    store: &mut RoundStore,
    ids: &SequentialIdGen,
    paths: &[&str],
) -> Vec<TaskId> {
    store.enqueue(paths.iter().copied(), ids, NOW).added
}

/// Assert the four status buckets partition the task table.
pub(super) fn assert_partition(store: &RoundStore) {
    let counts = store.counts();
    assert_eq!(
        counts.pending + counts.processing + counts.completed + counts.failed,
        counts.total,
        "status buckets must partition the task table: {:?}",
        counts
    );
}
