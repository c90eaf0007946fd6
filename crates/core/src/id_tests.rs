// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn job_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(JobId::from_string("t1"), 42);
    assert_eq!(map.get("t1"), Some(&42));
}

#[test]
fn job_id_serde_is_transparent() {
    let id = JobId::from_string("t1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"t1\"");

    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[yare::parameterized(
    simple     = { "t1" },
    dated      = { "retention_2025-09-05" },
    with_colon = { "nightly:2025.09.05" },
)]
fn parse_accepts_path_safe_ids(raw: &str) {
    assert_eq!(JobId::parse(raw).unwrap(), raw);
}

#[yare::parameterized(
    empty       = { "",            InvalidJobId::Empty },
    slash       = { "a/b",         InvalidJobId::InvalidChar('/') },
    space       = { "a b",         InvalidJobId::InvalidChar(' ') },
    parent_dir  = { "..",          InvalidJobId::LeadingDot },
    hidden      = { ".t1",         InvalidJobId::LeadingDot },
)]
fn parse_rejects_unsafe_ids(raw: &str, expected: InvalidJobId) {
    assert_eq!(JobId::parse(raw).unwrap_err(), expected);
}

#[test]
fn parse_rejects_overlong_ids() {
    let raw = "x".repeat(MAX_ID_LEN + 1);
    assert_eq!(JobId::parse(&raw).unwrap_err(), InvalidJobId::TooLong);
}

#[test]
fn generate_joins_name_stage_and_timestamp() {
    let id = JobId::generate("retention", "primary", "20250905T101500123");
    assert_eq!(id, "retention_primary_20250905T101500123");
    assert!(JobId::parse(id.as_str()).is_ok());
}

#[test]
fn generate_replaces_unsafe_characters() {
    let id = JobId::generate("skill promotion", "stage/1", "1");
    assert_eq!(id, "skill-promotion_stage-1_1");
}
