// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// ── Round ids ────────────────────────────────────────────────────────────────

#[test]
fn round_id_from_seq_zero_pads() {
    assert_eq!(RoundId::from_seq(1).as_str(), "round_0001");
    assert_eq!(RoundId::from_seq(42).as_str(), "round_0042");
    assert_eq!(RoundId::from_seq(12345).as_str(), "round_12345");
}

#[test]
fn round_id_seq_parses_back() {
    assert_eq!(RoundId::from_seq(7).seq(), Some(7));
    assert_eq!(RoundId::new("round_0031").seq(), Some(31));
    assert_eq!(RoundId::new("not-a-round").seq(), None);
}

// ── Counts ───────────────────────────────────────────────────────────────────

#[test]
fn empty_counts_are_drained() {
    assert!(RoundCounts::default().is_drained());
    assert!(!RoundCounts::default().all_completed());
}

#[test]
fn drained_with_failures_is_not_all_completed() {
    let counts = RoundCounts {
        total: 3,
        pending: 0,
        processing: 0,
        completed: 2,
        failed: 1,
    };
    assert!(counts.is_drained());
    assert!(!counts.all_completed());
}

#[test]
fn all_completed_needs_every_task_done() {
    let counts = RoundCounts {
        total: 2,
        pending: 0,
        processing: 0,
        completed: 2,
        failed: 0,
    };
    assert!(counts.all_completed());
}

// ── Processed totals ─────────────────────────────────────────────────────────

#[test]
fn processed_totals_accumulate() {
    let mut totals = ProcessedTotals::default();
    totals.add(10, 5.0, 1_000);
    totals.add(10, 5.0, 2_000);

    assert_eq!(totals.item_num, 20);
    assert!((totals.running_time - 10.0).abs() < f64::EPSILON);
    assert_eq!(totals.last_processed_at, Some(2_000));
}

// ── Metadata ─────────────────────────────────────────────────────────────────

#[test]
fn metadata_name_defaults_to_id() {
    let meta = RoundMetadata::new(
        RoundId::from_seq(3),
        None,
        SourceType::Manual,
        None,
        1_000,
    );
    assert_eq!(meta.name, "round_0003");
    assert_eq!(meta.status, RoundStatus::Pending);
    assert!(meta.activated_at.is_none());
    assert!(meta.completed_at.is_none());
}

#[test]
fn metadata_blank_name_falls_back_to_id() {
    let meta = RoundMetadata::new(
        RoundId::from_seq(1),
        Some("   ".to_string()),
        SourceType::File,
        None,
        1_000,
    );
    assert_eq!(meta.name, "round_0001");
}

#[test]
fn metadata_name_truncated_to_limit() {
    let long = "x".repeat(MAX_ROUND_NAME_LEN + 10);
    let meta = RoundMetadata::new(
        RoundId::from_seq(1),
        Some(long),
        SourceType::Folder,
        Some("/data".to_string()),
        1_000,
    );
    assert_eq!(meta.name.chars().count(), MAX_ROUND_NAME_LEN);
}

#[test]
fn metadata_name_truncation_is_char_safe() {
    let long = "数".repeat(MAX_ROUND_NAME_LEN + 5);
    let meta = RoundMetadata::new(RoundId::from_seq(1), Some(long), SourceType::Manual, None, 0);
    assert_eq!(meta.name.chars().count(), MAX_ROUND_NAME_LEN);
}

#[test]
fn metadata_serde_uses_camel_case() {
    let meta = RoundMetadata::new(
        RoundId::from_seq(2),
        Some("批次二".to_string()),
        SourceType::File,
        Some("list.txt".to_string()),
        9_000,
    );
    let json = serde_json::to_value(&meta).expect("serialize");
    assert_eq!(json["sourceType"], "file");
    assert_eq!(json["sourceHint"], "list.txt");
    assert_eq!(json["createdAt"], 9_000);
    assert_eq!(json["activatedAt"], serde_json::Value::Null);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["counts"]["total"], 0);
}
