// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::ConfigPatch;

fn progress() -> FleetProgress {
    FleetProgress {
        total_rounds: 2,
        completed_rounds: 2,
        counts: RoundCounts {
            total: 5,
            pending: 0,
            processing: 0,
            completed: 4,
            failed: 1,
        },
        item_num: 200,
        running_time: 100.0,
    }
}

// ── Digest ───────────────────────────────────────────────────────────────────

#[test]
fn all_completed_requires_every_round() {
    let mut p = progress();
    assert!(p.all_completed());
    p.completed_rounds = 1;
    assert!(!p.all_completed());
    p.total_rounds = 0;
    p.completed_rounds = 0;
    assert!(!p.all_completed());
}

#[test]
fn canonical_digest_is_stable() {
    let digest = progress().digest();
    assert_eq!(
        digest.canonical(),
        "rounds=2/2;tasks=4/5;failed=1;items=200;secs=100"
    );
    // Identical progress → identical digest
    assert_eq!(progress().digest().canonical(), digest.canonical());
}

#[test]
fn digest_rounds_running_time() {
    let mut p = progress();
    p.running_time = 99.7;
    assert!(p.digest().canonical().contains("secs=100"));
    p.running_time = 99.2;
    assert!(p.digest().canonical().contains("secs=99"));
}

#[test]
fn digest_changes_with_counts() {
    let mut p = progress();
    let before = p.digest().canonical();
    p.counts.completed = 5;
    p.counts.failed = 0;
    assert_ne!(p.digest().canonical(), before);
}

// ── Message text ─────────────────────────────────────────────────────────────

#[test]
fn completion_text_summarizes_progress() {
    let text = completion_text(&progress());
    assert!(text.contains("调度完成"));
    assert!(text.contains("2 个批次"));
    assert!(text.contains("成功 4"));
    assert!(text.contains("失败 1"));
    assert!(text.contains("200 条"));
    assert!(text.contains("1分40秒"));
    assert!(text.contains("2.00 条/秒"));
    assert!(text.contains("50.0 秒"));
}

#[test]
fn completion_text_omits_averages_without_data() {
    let mut p = progress();
    p.item_num = 0;
    p.running_time = 0.0;
    let text = completion_text(&p);
    assert!(!text.contains("条/秒"));
}

#[test]
fn progress_text_includes_open_counts() {
    let mut p = progress();
    p.counts.pending = 3;
    p.counts.processing = 2;
    let text = progress_text(&p);
    assert!(text.contains("进度汇报"));
    assert!(text.contains("待处理 3"));
    assert!(text.contains("处理中 2"));
}

// ── Reporting state ──────────────────────────────────────────────────────────

fn config_with_webhook(interval: u32) -> DispatchConfig {
    DispatchConfig::default()
        .apply(&ConfigPatch {
            feishu_webhook_url: Some(Some("https://open.feishu.cn/hook/x".to_string())),
            feishu_report_interval_minutes: Some(interval),
            ..ConfigPatch::default()
        })
        .expect("config")
}

#[test]
fn reconfigure_enables_with_webhook_and_interval() {
    let mut state = ReportingState::default();
    state.reconfigure(&config_with_webhook(60), 1_000);
    assert!(state.reporting_enabled);
    assert_eq!(state.next_report_at, Some(1_000 + 60 * 60_000));
}

#[test]
fn reconfigure_disables_without_webhook() {
    let mut state = ReportingState::default();
    state.reconfigure(&config_with_webhook(60), 1_000);
    state.reconfigure(&DispatchConfig::default(), 2_000);
    assert!(!state.reporting_enabled);
    assert!(state.next_report_at.is_none());
}

#[test]
fn zero_interval_disables_reporting() {
    let mut state = ReportingState::default();
    state.reconfigure(&config_with_webhook(0), 1_000);
    assert!(!state.reporting_enabled);
}

#[test]
fn mark_reported_advances_schedule() {
    let config = config_with_webhook(10);
    let mut state = ReportingState::default();
    state.reconfigure(&config, 1_000);
    state.mark_reported(&config, 5_000);
    assert_eq!(state.last_report_at, Some(5_000));
    assert_eq!(state.next_report_at, Some(5_000 + 10 * 60_000));
}
