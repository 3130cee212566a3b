// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker node identifier and telemetry sample.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier a worker node presents when leasing or reporting.
    ///
    /// Nodes are not authenticated; any caller-supplied id is trusted.
    pub struct NodeId;
}

/// One telemetry sample in a node's recent window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRecord {
    /// When the sample was recorded (epoch ms)
    pub at: u64,
    /// Items the node processed in this sample
    pub item_num: u64,
    /// Running time of the sample in seconds
    pub running_time: f64,
    /// Derived items-per-second (0 when running time is 0)
    pub speed: f64,
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
