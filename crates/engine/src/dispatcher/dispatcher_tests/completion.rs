// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion detector edges and the manual report trigger.

use super::*;
use crate::error::ReportTriggerError;
use rup_core::ConfigPatch;

#[tokio::test]
async fn webhook_fires_once_when_everything_completes() {
    let fx = fixture_with_webhook();
    import_round(&fx, &["/a", "/b"]).await;
    drain_round(&fx, 10).await;

    let calls = fx.webhook.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].text.contains("调度完成"));
    assert!(calls[0].url.contains("open.feishu.cn"));
    assert!(fx.dispatcher.completion_digest().is_some());
}

#[tokio::test]
async fn repeated_completion_preserving_mutations_do_not_refire() {
    let fx = fixture_with_webhook();
    import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    assert_eq!(fx.webhook.calls().len(), 1);
    let digest = fx.dispatcher.completion_digest().expect("digest");

    // A sweep over the completed fleet shifts nothing
    fx.dispatcher.sweep(0, None).await.expect("sweep");
    assert_eq!(fx.webhook.calls().len(), 1);
    assert_eq!(fx.dispatcher.completion_digest(), Some(digest));
}

#[tokio::test]
async fn breaking_and_restoring_completion_fires_again() {
    let fx = fixture_with_webhook();
    import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    assert_eq!(fx.webhook.calls().len(), 1);

    // New work breaks the all-completed condition and clears the digest
    import_round(&fx, &["/b"]).await;
    assert!(fx.dispatcher.completion_digest().is_none());

    drain_round(&fx, 10).await;
    assert_eq!(fx.webhook.calls().len(), 2);
}

#[tokio::test]
async fn no_webhook_configured_means_no_fire() {
    let fx = fixture();
    import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;

    assert!(fx.webhook.calls().is_empty());
    // The edge stays armed: configuring a URL and clearing rounds later can
    // still fire on the next completion
    assert!(fx.dispatcher.completion_digest().is_none());
}

#[tokio::test]
async fn failed_post_leaves_the_edge_armed() {
    let fx = fixture_with_webhook();
    fx.webhook.fail_with_status(Some(500));
    import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;

    assert!(fx.dispatcher.completion_digest().is_none());

    // The next count-shifting mutation retries the edge
    fx.webhook.fail_with_status(None);
    let round = import_round(&fx, &["/b"]).await;
    drain_round(&fx, 10).await;
    assert_eq!(fx.webhook.calls().len(), 1);
    assert!(fx.sink.get(&round).is_some());
}

#[tokio::test]
async fn clearing_the_last_round_resets_the_digest() {
    let fx = fixture_with_webhook();
    let round = import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    assert!(fx.dispatcher.completion_digest().is_some());

    let cleared = fx.dispatcher.clear_round(&round).await.expect("clear");
    assert_eq!(cleared, 1);
    assert!(fx.dispatcher.completion_digest().is_none());
    assert!(fx.dispatcher.list_rounds().is_empty());
    assert!(fx.sink.get(&round).is_none());
}

#[tokio::test]
async fn clearing_an_open_round_can_complete_the_fleet() {
    let fx = fixture_with_webhook();
    import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    assert_eq!(fx.webhook.calls().len(), 1);

    // A second, still-pending round holds the fleet open
    let round_b = import_round(&fx, &["/b"]).await;
    assert!(fx.dispatcher.completion_digest().is_none());

    // Dropping it restores all-completed and fires a fresh edge
    fx.dispatcher.clear_round(&round_b).await.expect("clear");
    assert_eq!(fx.webhook.calls().len(), 2);
}

#[tokio::test]
async fn clear_all_empties_the_sink_and_state() {
    let fx = fixture();
    import_round(&fx, &["/a", "/b"]).await;
    import_round(&fx, &["/c"]).await;

    let cleared = fx.dispatcher.clear_all().await;
    assert_eq!(cleared, 3);
    assert!(fx.dispatcher.list_rounds().is_empty());
    assert!(fx.sink.is_empty());
    assert!(fx
        .dispatcher
        .lease(Some(5), None, None)
        .expect("lease")
        .is_empty());
}

// ── Manual trigger ───────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_trigger_posts_progress() {
    let fx = fixture_with_webhook();
    import_round(&fx, &["/a", "/b"]).await;

    fx.dispatcher.trigger_report().await.expect("trigger");
    let calls = fx.webhook.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].text.contains("进度汇报"));

    let (_, reporting) = fx.dispatcher.config();
    assert!(reporting.last_report_at.is_some());
    assert!(!reporting.in_flight);
}

#[tokio::test]
async fn manual_trigger_without_webhook_refuses() {
    let fx = fixture();
    let err = fx.dispatcher.trigger_report().await.expect_err("no webhook");
    assert_eq!(err, ReportTriggerError::NoWebhook);
}

#[tokio::test]
async fn manual_trigger_with_zero_interval_is_disabled() {
    let fx = fixture_with_webhook();
    fx.dispatcher
        .update_config(&ConfigPatch {
            feishu_report_interval_minutes: Some(0),
            ..ConfigPatch::default()
        })
        .expect("config");

    let err = fx.dispatcher.trigger_report().await.expect_err("disabled");
    assert_eq!(err, ReportTriggerError::ReportingDisabled);
}

#[tokio::test]
async fn manual_trigger_maps_http_and_transport_errors() {
    let fx = fixture_with_webhook();
    fx.webhook.fail_with_status(Some(502));
    assert_eq!(
        fx.dispatcher.trigger_report().await.expect_err("http"),
        ReportTriggerError::Http(502)
    );

    fx.webhook.fail_with_status(None);
    fx.webhook.fail_with_transport(Some("boom".to_string()));
    match fx.dispatcher.trigger_report().await.expect_err("transport") {
        ReportTriggerError::Exception(message) => assert!(message.contains("boom")),
        other => panic!("expected exception, got {other:?}"),
    }

    // in_flight was released both times
    let (_, reporting) = fx.dispatcher.config();
    assert!(!reporting.in_flight);
}

#[tokio::test]
async fn manual_trigger_leaves_the_completion_digest_alone() {
    let fx = fixture_with_webhook();
    import_round(&fx, &["/a"]).await;
    drain_round(&fx, 10).await;
    let digest = fx.dispatcher.completion_digest().expect("digest");
    assert_eq!(fx.webhook.calls().len(), 1);

    // Manual trigger re-posts even though all-completed already fired
    fx.dispatcher.trigger_report().await.expect("trigger");
    assert_eq!(fx.webhook.calls().len(), 2);
    assert_eq!(fx.dispatcher.completion_digest(), Some(digest));
}
