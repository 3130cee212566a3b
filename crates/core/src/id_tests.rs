// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Test-only id type.
    pub struct SampleId;
}

#[test]
fn display_and_as_str_roundtrip() {
    let id = SampleId::new("abc-123");
    assert_eq!(id.as_str(), "abc-123");
    assert_eq!(id.to_string(), "abc-123");
}

#[test]
fn eq_against_str_slices() {
    let id = SampleId::from("abc");
    assert_eq!(id, *"abc");
    assert_eq!(id, "abc");
}

#[test]
fn serde_is_a_plain_string() {
    let id = SampleId::new("abc");
    let json = serde_json::to_string(&id).expect("serialize");
    assert_eq!(json, "\"abc\"");
    let back: SampleId = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, id);
}

#[test]
fn uuid_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn sequential_gen_counts_up() {
    let gen = SequentialIdGen::new("t");
    assert_eq!(gen.next(), "t-1");
    assert_eq!(gen.next(), "t-2");

    // Clones share the counter
    let clone = gen.clone();
    assert_eq!(clone.next(), "t-3");
    assert_eq!(gen.next(), "t-4");
}
