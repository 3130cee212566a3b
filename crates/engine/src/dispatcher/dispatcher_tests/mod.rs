// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

mod completion;
mod config;
mod eviction;
mod import;
mod lease;
mod nodes;
mod report_sweep;
mod rounds;

use crate::round_store::TaskFilter;
use crate::test_helpers::{fixture, fixture_with_webhook, reopen, Fixture};
use rup_core::{NodeId, RoundId, RoundStatus, SourceType, TaskStatus};

use super::*;

/// Import the given paths as a fresh round and return its id.
pub(super) async fn import_round(fx: &Fixture, paths: &[&str]) -> RoundId {
    fx.dispatcher
        .import(
            paths.iter().copied(),
            ImportOptions {
                source_type: SourceType::Manual,
                ..ImportOptions::default()
            },
        )
        .await
        .expect("import")
        .round_id
}

/// Lease `batch` tasks and report each one as a success.
pub(super) async fn drain_round(fx: &Fixture, batch: u32) {
    let leased = fx
        .dispatcher
        .lease(Some(batch), None, None)
        .expect("lease");
    for task in leased {
        fx.dispatcher
            .report(&task.task_id, true, None)
            .await
            .expect("report");
    }
}

/// Round summary by id.
pub(super) fn summary_of(fx: &Fixture, id: &RoundId) -> RoundSummary {
    fx.dispatcher
        .list_rounds()
        .into_iter()
        .find(|r| r.id == *id)
        .expect("round summary")
}
