// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    zero        = { 0, "0秒" },
    seconds     = { 42, "42秒" },
    exact_min   = { 300, "5分" },
    min_and_sec = { 330, "5分30秒" },
    exact_hour  = { 3600, "1小时" },
    hour_and_min = { 8100, "2小时15分" },
    exact_day   = { 172800, "2天" },
    day_and_hour = { 266400, "3天2小时" },
)]
fn formats_durations(secs: u64, expected: &str) {
    assert_eq!(format_duration_zh(secs), expected);
}
