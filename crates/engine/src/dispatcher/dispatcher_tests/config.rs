// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rup_core::ConfigPatch;

#[tokio::test]
async fn config_starts_with_defaults() {
    let fx = fixture();
    let (config, reporting) = fx.dispatcher.config();
    assert_eq!(config.default_batch_size, 8);
    assert_eq!(config.max_batch_size, 1000);
    assert!(config.feishu_webhook_url.is_none());
    assert!(!reporting.reporting_enabled);
    assert!(reporting.next_report_at.is_none());
}

#[tokio::test]
async fn update_validates_as_a_whole() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .update_config(&ConfigPatch {
            default_batch_size: Some(0),
            ..ConfigPatch::default()
        })
        .expect_err("invalid batch");
    assert_eq!(err.code(), "INVALID_INPUT");

    // The failed update left everything untouched
    let (config, _) = fx.dispatcher.config();
    assert_eq!(config.default_batch_size, 8);
}

#[tokio::test]
async fn webhook_update_reconfigures_reporting() {
    let fx = fixture();
    fx.dispatcher
        .update_config(&ConfigPatch {
            feishu_webhook_url: Some(Some("https://open.feishu.cn/hook/x".to_string())),
            feishu_report_interval_minutes: Some(60),
            ..ConfigPatch::default()
        })
        .expect("update");

    let (_, reporting) = fx.dispatcher.config();
    assert!(reporting.reporting_enabled);
    assert_eq!(
        reporting.next_report_at,
        Some(fx.clock.epoch_ms() + 60 * 60_000)
    );
}

#[tokio::test]
async fn clearing_webhook_disables_reporting() {
    let fx = fixture_with_webhook();
    fx.dispatcher
        .update_config(&ConfigPatch {
            feishu_webhook_url: Some(None),
            ..ConfigPatch::default()
        })
        .expect("update");

    let (config, reporting) = fx.dispatcher.config();
    assert!(config.feishu_webhook_url.is_none());
    assert!(!reporting.reporting_enabled);
}

#[tokio::test]
async fn unrelated_update_keeps_reporting_schedule() {
    let fx = fixture_with_webhook();
    let (_, before) = fx.dispatcher.config();

    fx.clock.advance(std::time::Duration::from_secs(60));
    fx.dispatcher
        .update_config(&ConfigPatch {
            default_batch_size: Some(4),
            ..ConfigPatch::default()
        })
        .expect("update");

    let (_, after) = fx.dispatcher.config();
    assert_eq!(after.next_report_at, before.next_report_at);
}

#[tokio::test]
async fn non_https_webhook_is_rejected() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .update_config(&ConfigPatch {
            feishu_webhook_url: Some(Some("http://insecure".to_string())),
            ..ConfigPatch::default()
        })
        .expect_err("must be https");
    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(err.to_string().contains("https"));
}

#[tokio::test]
async fn legacy_failure_threshold_is_stored_but_ignored_by_the_sweep() {
    let fx = fixture();
    fx.dispatcher
        .update_config(&ConfigPatch {
            task_failure_threshold: Some(9),
            ..ConfigPatch::default()
        })
        .expect("update");
    let (config, _) = fx.dispatcher.config();
    assert_eq!(config.task_failure_threshold, 9);

    // The sweep still applies the fixed one-retry policy
    import_round(&fx, &["/x"]).await;
    fx.dispatcher.lease(Some(1), None, None).expect("lease");
    fx.dispatcher.sweep(0, None).await.expect("sweep");
    fx.dispatcher.lease(Some(1), None, None).expect("lease");
    fx.dispatcher.sweep(0, None).await.expect("sweep");

    let exported = fx.dispatcher.export_failed(None, None).expect("export");
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].failure_count, 2);
}
