// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::snapshot::tests::sample_snapshot;
use rup_core::RoundId;

// ── Filesystem sink ──────────────────────────────────────────────────────────

#[test]
fn fs_sink_write_read_delete_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = FsRoundSink::new(dir.path());
    let snapshot = sample_snapshot("round_0001");

    assert!(sink
        .read(&RoundId::new("round_0001"))
        .expect("read")
        .is_none());

    sink.write(&snapshot).expect("write");
    let loaded = sink
        .read(&RoundId::new("round_0001"))
        .expect("read")
        .expect("present");
    assert_eq!(loaded, snapshot);

    sink.delete(&RoundId::new("round_0001")).expect("delete");
    assert!(sink
        .read(&RoundId::new("round_0001"))
        .expect("read")
        .is_none());
}

#[test]
fn fs_sink_delete_absent_is_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = FsRoundSink::new(dir.path());
    sink.delete(&RoundId::new("round_9999")).expect("delete");
}

#[test]
fn fs_sink_lists_sorted_round_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = FsRoundSink::new(dir.path());

    sink.write(&sample_snapshot("round_0002")).expect("write");
    sink.write(&sample_snapshot("round_0001")).expect("write");
    // Non-json files are ignored
    std::fs::write(dir.path().join("notes.txt"), "x").expect("write file");

    let ids = sink.list_ids().expect("list");
    assert_eq!(
        ids.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
        vec!["round_0001", "round_0002"]
    );
}

#[test]
fn fs_sink_list_without_directory_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = FsRoundSink::new(dir.path().join("never-created"));
    assert!(sink.list_ids().expect("list").is_empty());
}

// ── Memory sink ──────────────────────────────────────────────────────────────

#[test]
fn memory_sink_write_read_delete_cycle() {
    let sink = MemorySink::new();
    let snapshot = sample_snapshot("round_0001");

    sink.write(&snapshot).expect("write");
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.write_count(), 1);

    let loaded = sink
        .read(&RoundId::new("round_0001"))
        .expect("read")
        .expect("present");
    assert_eq!(loaded, snapshot);

    sink.delete(&RoundId::new("round_0001")).expect("delete");
    assert!(sink.is_empty());
}

#[test]
fn memory_sink_injected_write_failure() {
    let sink = MemorySink::new();
    sink.fail_writes(true);
    assert!(sink.write(&sample_snapshot("round_0001")).is_err());
    assert!(sink.is_empty());

    sink.fail_writes(false);
    sink.write(&sample_snapshot("round_0001")).expect("write");
}

#[test]
fn memory_sink_injected_read_failure() {
    let sink = MemorySink::new();
    sink.write(&sample_snapshot("round_0001")).expect("write");
    sink.fail_reads(true);
    assert!(sink.read(&RoundId::new("round_0001")).is_err());
}
