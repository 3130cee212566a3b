// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn processed_record_serde_camel_case() {
    let record = ProcessedRecord {
        at: 1_000,
        item_num: 10,
        running_time: 5.0,
        speed: 2.0,
    };
    let json = serde_json::to_value(record).expect("serialize");
    assert_eq!(json["at"], 1_000);
    assert_eq!(json["itemNum"], 10);
    assert_eq!(json["runningTime"], 5.0);
    assert_eq!(json["speed"], 2.0);
}

#[test]
fn node_id_is_a_plain_string_wrapper() {
    let id = NodeId::new("worker-7");
    assert_eq!(id.as_str(), "worker-7");
    assert_eq!(id, "worker-7");
}
