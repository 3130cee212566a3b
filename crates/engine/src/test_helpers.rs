// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for the engine crate (and downstream spec tests).
#![allow(clippy::expect_used)]

use crate::dispatcher::Dispatcher;
use crate::webhook::FakeWebhookSink;
use rup_core::{ConfigPatch, DispatchConfig, FakeClock, SequentialIdGen};
use rup_storage::MemorySink;

/// Dispatcher wired to fully-controllable fakes.
pub type TestDispatcher = Dispatcher<MemorySink, FakeWebhookSink, FakeClock, SequentialIdGen>;

/// A dispatcher plus handles to its fakes.
pub struct Fixture {
    pub dispatcher: TestDispatcher,
    pub sink: MemorySink,
    pub webhook: FakeWebhookSink,
    pub clock: FakeClock,
}

/// Fresh dispatcher over an in-memory sink, a fake webhook, a fake clock,
/// and sequential `task-N` ids.
pub fn fixture() -> Fixture {
    fixture_with_config(DispatchConfig::default())
}

pub fn fixture_with_config(config: DispatchConfig) -> Fixture {
    let sink = MemorySink::new();
    let webhook = FakeWebhookSink::new();
    let clock = FakeClock::new();
    let dispatcher = Dispatcher::new(
        sink.clone(),
        webhook.clone(),
        clock.clone(),
        SequentialIdGen::new("task"),
        config,
    );
    Fixture {
        dispatcher,
        sink,
        webhook,
        clock,
    }
}

/// Same fixture with a webhook URL already configured.
pub fn fixture_with_webhook() -> Fixture {
    let fx = fixture();
    fx.dispatcher
        .update_config(&ConfigPatch {
            feishu_webhook_url: Some(Some("https://open.feishu.cn/hook/test".to_string())),
            ..ConfigPatch::default()
        })
        .expect("configure webhook");
    fx
}

/// Re-open a dispatcher over an existing sink (restart simulation).
pub fn reopen(fx: &Fixture) -> TestDispatcher {
    Dispatcher::open(
        fx.sink.clone(),
        fx.webhook.clone(),
        fx.clock.clone(),
        SequentialIdGen::new("task2"),
        DispatchConfig::default(),
    )
    .expect("reopen dispatcher")
}
