// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rup-engine: the Roundup task dispatch engine
//!
//! The [`Dispatcher`] is the process-wide façade: it owns the ordered round
//! registry, the task→round index, the node statistics store, and the
//! configuration view, all behind one coarse lock. Round state lives in
//! [`RoundStore`] instances that are loaded from and evicted to a
//! [`rup_storage::RoundSink`].

pub mod completion;
pub mod dispatcher;
pub mod env;
pub mod error;
pub mod node_stats;
pub mod page;
pub mod round_store;
pub mod webhook;

#[cfg(any(test, feature = "test-support"))]
pub mod test_helpers;

pub use completion::{CompletionDigest, ReportingState};
pub use dispatcher::{
    Dispatcher, ExportedFailure, FoundTask, ImportOptions, ImportResult, InspectReport, LeasedTask,
    ProcessedInfo, RoundSummary,
};
pub use error::{DispatchError, ReportTriggerError};
pub use node_stats::{NodeStatsStore, NodeSummary, NodeView, NodesPage};
pub use page::TaskPage;
pub use round_store::{
    EnqueueOutcome, ProcessingSummary, ProcessingTaskView, RoundStore, RunStats, TaskFilter,
};
pub use webhook::{HttpWebhookSink, NoopWebhookSink, WebhookError, WebhookSink};

#[cfg(any(test, feature = "test-support"))]
pub use webhook::{FakeWebhookSink, WebhookCall};
