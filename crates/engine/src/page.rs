// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared pagination over in-memory lists.

use serde::Serialize;

/// One page of tasks (or any listable item) plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Paginate a fully-materialized list.
///
/// Page and page size are clamped to ≥1; a page past the end resolves to the
/// last page rather than an empty one.
pub(crate) fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> TaskPage<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let last_page = total.div_ceil(page_size).max(1);
    let page = page.clamp(1, last_page);

    let start = (page - 1) * page_size;
    let items = items
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect::<Vec<_>>();

    TaskPage {
        items,
        total,
        page,
        page_size,
    }
}

#[cfg(test)]
#[path = "page_tests.rs"]
mod tests;
