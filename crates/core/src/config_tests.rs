// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// ── Defaults and validation ──────────────────────────────────────────────────

#[test]
fn default_config_is_valid() {
    let config = DispatchConfig::default();
    assert_eq!(config.default_batch_size, 8);
    assert_eq!(config.max_batch_size, 1000);
    assert!(config.feishu_webhook_url.is_none());
    assert_eq!(config.feishu_report_interval_minutes, 240);
    assert!(config.validate().is_ok());
}

#[yare::parameterized(
    zero_default = { 0, 10 },
    zero_max     = { 8, 0 },
)]
fn zero_batch_sizes_rejected(default_size: u32, max_size: u32) {
    let config = DispatchConfig {
        default_batch_size: default_size,
        max_batch_size: max_size,
        ..DispatchConfig::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::NonPositiveBatchSize));
}

#[test]
fn default_above_max_rejected() {
    let config = DispatchConfig {
        default_batch_size: 100,
        max_batch_size: 10,
        ..DispatchConfig::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::DefaultExceedsMax));
}

#[test]
fn non_https_webhook_rejected() {
    let config = DispatchConfig {
        feishu_webhook_url: Some("http://example.com/hook".to_string()),
        ..DispatchConfig::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::WebhookNotHttps));
}

// ── Patch application ────────────────────────────────────────────────────────

#[test]
fn patch_updates_only_named_fields() {
    let config = DispatchConfig::default();
    let next = config
        .apply(&ConfigPatch {
            default_batch_size: Some(16),
            ..ConfigPatch::default()
        })
        .expect("apply");
    assert_eq!(next.default_batch_size, 16);
    assert_eq!(next.max_batch_size, config.max_batch_size);
}

#[test]
fn invalid_patch_leaves_config_untouched() {
    let config = DispatchConfig::default();
    let err = config.apply(&ConfigPatch {
        max_batch_size: Some(0),
        ..ConfigPatch::default()
    });
    assert_eq!(err, Err(ConfigError::NonPositiveBatchSize));
    assert_eq!(config.max_batch_size, 1000);
}

#[test]
fn patch_can_set_and_clear_webhook() {
    let config = DispatchConfig::default();
    let with_hook = config
        .apply(&ConfigPatch {
            feishu_webhook_url: Some(Some("https://open.feishu.cn/hook/x".to_string())),
            ..ConfigPatch::default()
        })
        .expect("apply");
    assert_eq!(
        with_hook.feishu_webhook_url.as_deref(),
        Some("https://open.feishu.cn/hook/x")
    );

    let cleared = with_hook
        .apply(&ConfigPatch {
            feishu_webhook_url: Some(None),
            ..ConfigPatch::default()
        })
        .expect("apply");
    assert!(cleared.feishu_webhook_url.is_none());
}

#[test]
fn patch_json_null_clears_webhook() {
    let patch: ConfigPatch =
        serde_json::from_str(r#"{"feishuWebhookUrl": null}"#).expect("deserialize");
    assert_eq!(patch.feishu_webhook_url, Some(None));

    let patch: ConfigPatch = serde_json::from_str("{}").expect("deserialize");
    assert_eq!(patch.feishu_webhook_url, None);
}

#[test]
fn legacy_failure_threshold_round_trips() {
    let config = DispatchConfig::default()
        .apply(&ConfigPatch {
            task_failure_threshold: Some(5),
            ..ConfigPatch::default()
        })
        .expect("apply");
    assert_eq!(config.task_failure_threshold, 5);

    let json = serde_json::to_value(&config).expect("serialize");
    assert_eq!(json["taskFailureThreshold"], 5);
}
