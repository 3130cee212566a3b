// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use rup_core::DispatchConfig;
use std::path::PathBuf;

/// Resolve state directory: RUP_STATE_DIR > XDG_STATE_HOME/roundup >
/// ~/.local/state/roundup.
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("RUP_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("roundup"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/roundup"))
}

/// Build the initial configuration from `RUP_*` environment overrides.
///
/// Unparseable or inconsistent overrides fall back to the defaults with a
/// warning rather than refusing to start.
pub fn config_from_env() -> DispatchConfig {
    let defaults = DispatchConfig::default();
    let config = DispatchConfig {
        default_batch_size: env_u32("RUP_DEFAULT_BATCH_SIZE")
            .unwrap_or(defaults.default_batch_size),
        max_batch_size: env_u32("RUP_MAX_BATCH_SIZE").unwrap_or(defaults.max_batch_size),
        feishu_webhook_url: std::env::var("RUP_FEISHU_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty()),
        feishu_report_interval_minutes: env_u32("RUP_FEISHU_REPORT_INTERVAL_MINUTES")
            .unwrap_or(defaults.feishu_report_interval_minutes),
        task_failure_threshold: env_u32("RUP_TASK_FAILURE_THRESHOLD")
            .unwrap_or(defaults.task_failure_threshold),
    };

    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            tracing::warn!(error = %e, "invalid RUP_* configuration, using defaults");
            defaults
        }
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
