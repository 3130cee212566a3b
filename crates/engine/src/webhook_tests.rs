// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_sink_records_posts() {
    let sink = FakeWebhookSink::new();
    sink.post("https://example.com/hook", "你好")
        .await
        .expect("post");

    let calls = sink.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "https://example.com/hook");
    assert_eq!(calls[0].text, "你好");
}

#[tokio::test]
async fn fake_sink_injected_status_failure() {
    let sink = FakeWebhookSink::new();
    sink.fail_with_status(Some(502));

    match sink.post("https://example.com/hook", "x").await {
        Err(WebhookError::Status(502)) => {}
        other => panic!("expected status failure, got {:?}", other.err()),
    }
    assert!(sink.calls().is_empty());

    sink.fail_with_status(None);
    sink.post("https://example.com/hook", "x").await.expect("post");
}

#[tokio::test]
async fn fake_sink_injected_transport_failure() {
    let sink = FakeWebhookSink::new();
    sink.fail_with_transport(Some("connection refused".to_string()));

    match sink.post("https://example.com/hook", "x").await {
        Err(WebhookError::Transport(message)) => {
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected transport failure, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn noop_sink_always_succeeds() {
    NoopWebhookSink
        .post("https://example.com/hook", "x")
        .await
        .expect("noop post");
}

#[tokio::test]
async fn http_sink_surfaces_transport_errors() {
    // Nothing listens on this address; the client must fail with a
    // transport error rather than a panic
    let sink = HttpWebhookSink::new();
    let result = sink.post("http://127.0.0.1:1/hook", "x").await;
    assert!(matches!(result, Err(WebhookError::Transport(_))));
}

#[test]
fn error_display_names_the_status() {
    assert!(WebhookError::Status(500).to_string().contains("500"));
}
