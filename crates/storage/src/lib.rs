// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rup-storage: per-round snapshot persistence for Roundup

mod sink;
mod snapshot;

pub use sink::{FsRoundSink, RoundSink};
pub use snapshot::{RoundSnapshot, SnapshotError, StoreSnapshot};

#[cfg(any(test, feature = "test-support"))]
pub use sink::MemorySink;
