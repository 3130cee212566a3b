// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global completion detection and operator report text.
//!
//! After every state change that can shift counts, the dispatcher derives a
//! [`FleetProgress`] rollup and compares its [`CompletionDigest`] against the
//! last digest a webhook was fired for. Equal digest → no re-fire; condition
//! broken → digest cleared so the next completion edge fires again.

use rup_core::{format_duration_zh, DispatchConfig, RoundCounts};
use serde::Serialize;

/// Aggregated progress across every round (hot or cold).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetProgress {
    pub total_rounds: usize,
    pub completed_rounds: usize,
    pub counts: RoundCounts,
    pub item_num: u64,
    pub running_time: f64,
}

impl FleetProgress {
    /// Whether every round reached `completed` (and at least one exists).
    pub fn all_completed(&self) -> bool {
        self.total_rounds >= 1 && self.completed_rounds == self.total_rounds
    }

    pub fn digest(&self) -> CompletionDigest {
        CompletionDigest {
            total_rounds: self.total_rounds,
            completed_rounds: self.completed_rounds,
            total_tasks: self.counts.total,
            completed_tasks: self.counts.completed,
            failed_tasks: self.counts.failed,
            rounded_items: self.item_num,
            rounded_running_time_secs: self.running_time.round() as u64,
        }
    }
}

/// Canonical fingerprint of global completion state.
///
/// Running time is rounded to whole seconds so float jitter in telemetry
/// cannot produce two digests for the same logical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionDigest {
    pub total_rounds: usize,
    pub completed_rounds: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub rounded_items: u64,
    pub rounded_running_time_secs: u64,
}

impl CompletionDigest {
    /// Canonical string compared across detector runs.
    pub fn canonical(&self) -> String {
        format!(
            "rounds={}/{};tasks={}/{};failed={};items={};secs={}",
            self.completed_rounds,
            self.total_rounds,
            self.completed_tasks,
            self.total_tasks,
            self.failed_tasks,
            self.rounded_items,
            self.rounded_running_time_secs,
        )
    }
}

/// State of the periodic/manual operator reporting channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingState {
    pub last_report_at: Option<u64>,
    pub next_report_at: Option<u64>,
    pub reporting_enabled: bool,
    pub in_flight: bool,
}

impl ReportingState {
    /// Recompute the schedule after a webhook/interval config change.
    pub fn reconfigure(&mut self, config: &DispatchConfig, now_ms: u64) {
        self.reporting_enabled =
            config.feishu_webhook_url.is_some() && config.feishu_report_interval_minutes > 0;
        self.next_report_at = self
            .reporting_enabled
            .then(|| now_ms + interval_ms(config));
        if !self.reporting_enabled {
            self.next_report_at = None;
        }
    }

    /// Record a successful report and schedule the next one.
    pub fn mark_reported(&mut self, config: &DispatchConfig, now_ms: u64) {
        self.last_report_at = Some(now_ms);
        if self.reporting_enabled {
            self.next_report_at = Some(now_ms + interval_ms(config));
        }
    }
}

fn interval_ms(config: &DispatchConfig) -> u64 {
    config.feishu_report_interval_minutes as u64 * 60_000
}

/// Build the Chinese completion notice posted when every round finishes.
pub fn completion_text(progress: &FleetProgress) -> String {
    let mut lines = vec![
        "【Roundup 调度完成】".to_string(),
        format!(
            "全部 {} 个批次已处理完毕",
            progress.total_rounds
        ),
        format!(
            "任务共 {} 个：成功 {}，失败 {}",
            progress.counts.total, progress.counts.completed, progress.counts.failed
        ),
        format!(
            "累计处理 {} 条，累计运行 {}",
            progress.item_num,
            format_duration_zh(progress.running_time.round() as u64)
        ),
    ];
    lines.extend(average_line(progress));
    lines.join("\n")
}

/// Build the Chinese progress report used by the manual/periodic trigger.
pub fn progress_text(progress: &FleetProgress) -> String {
    let mut lines = vec![
        "【Roundup 进度汇报】".to_string(),
        format!(
            "批次 {}/{} 已完成",
            progress.completed_rounds, progress.total_rounds
        ),
        format!(
            "任务共 {} 个：待处理 {}，处理中 {}，成功 {}，失败 {}",
            progress.counts.total,
            progress.counts.pending,
            progress.counts.processing,
            progress.counts.completed,
            progress.counts.failed
        ),
        format!(
            "累计处理 {} 条，累计运行 {}",
            progress.item_num,
            format_duration_zh(progress.running_time.round() as u64)
        ),
    ];
    lines.extend(average_line(progress));
    lines.join("\n")
}

fn average_line(progress: &FleetProgress) -> Option<String> {
    if progress.item_num == 0 || progress.running_time <= 0.0 {
        return None;
    }
    let speed = progress.item_num as f64 / progress.running_time;
    let per_100 = progress.running_time / progress.item_num as f64 * 100.0;
    Some(format!(
        "平均 {:.2} 条/秒，每百条约 {:.1} 秒",
        speed, per_100
    ))
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
