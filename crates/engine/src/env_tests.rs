// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_rup_env() {
    for name in [
        "RUP_STATE_DIR",
        "RUP_DEFAULT_BATCH_SIZE",
        "RUP_MAX_BATCH_SIZE",
        "RUP_FEISHU_WEBHOOK_URL",
        "RUP_FEISHU_REPORT_INTERVAL_MINUTES",
        "RUP_TASK_FAILURE_THRESHOLD",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn defaults_without_overrides() {
    clear_rup_env();
    let config = config_from_env();
    assert_eq!(config, DispatchConfig::default());
}

#[test]
#[serial]
fn overrides_are_applied() {
    clear_rup_env();
    std::env::set_var("RUP_DEFAULT_BATCH_SIZE", "16");
    std::env::set_var("RUP_MAX_BATCH_SIZE", "64");
    std::env::set_var("RUP_FEISHU_WEBHOOK_URL", "https://open.feishu.cn/hook/x");
    std::env::set_var("RUP_FEISHU_REPORT_INTERVAL_MINUTES", "30");

    let config = config_from_env();
    assert_eq!(config.default_batch_size, 16);
    assert_eq!(config.max_batch_size, 64);
    assert_eq!(
        config.feishu_webhook_url.as_deref(),
        Some("https://open.feishu.cn/hook/x")
    );
    assert_eq!(config.feishu_report_interval_minutes, 30);
    clear_rup_env();
}

#[test]
#[serial]
fn unparseable_override_falls_back() {
    clear_rup_env();
    std::env::set_var("RUP_DEFAULT_BATCH_SIZE", "lots");
    let config = config_from_env();
    assert_eq!(config.default_batch_size, 8);
    clear_rup_env();
}

#[test]
#[serial]
fn inconsistent_overrides_fall_back_to_defaults() {
    clear_rup_env();
    // Default above max is rejected as a whole
    std::env::set_var("RUP_DEFAULT_BATCH_SIZE", "100");
    std::env::set_var("RUP_MAX_BATCH_SIZE", "10");
    let config = config_from_env();
    assert_eq!(config, DispatchConfig::default());
    clear_rup_env();
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    clear_rup_env();
    std::env::set_var("RUP_STATE_DIR", "/tmp/rup-test");
    assert_eq!(
        state_dir(),
        Some(std::path::PathBuf::from("/tmp/rup-test"))
    );
    clear_rup_env();
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg_then_home() {
    clear_rup_env();
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");
    assert_eq!(
        state_dir(),
        Some(std::path::PathBuf::from("/tmp/xdg/roundup"))
    );
    std::env::remove_var("XDG_STATE_HOME");

    if let Ok(home) = std::env::var("HOME") {
        assert_eq!(
            state_dir(),
            Some(std::path::PathBuf::from(home).join(".local/state/roundup"))
        );
    }
}
