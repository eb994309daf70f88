// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::engine::{DriverError, Engine};
use crate::pool::PoolConfig;
use yare::parameterized;

const ALL_TAGS: [Tag; 5] = [Tag::Qa, Tag::Bug, Tag::Feature, Tag::Docs, Tag::Perf];

fn fixture() -> (Engine, TagArrayConverter) {
    let engine = Engine::open();
    engine.register_element_type(TAG_ELEMENT_TYPE);
    let pool = Pool::new(engine.clone(), PoolConfig::default()).unwrap();
    (engine, TagArrayConverter::new(pool))
}

fn tag_set(tags: &[Tag]) -> BTreeSet<Tag> {
    tags.iter().copied().collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[parameterized(
    qa_bug = { &[Tag::Qa, Tag::Bug] },
    single = { &[Tag::Docs] },
    all = { &ALL_TAGS },
)]
fn round_trip_preserves_set(tags: &[Tag]) {
    let (_engine, converter) = fixture();
    let set = tag_set(tags);

    let array = converter.to_persisted_value(Some(&set)).unwrap().unwrap();
    let decoded = converter.to_entity_value(Some(&array)).unwrap();

    assert_eq!(decoded, set);
}

#[test]
fn absent_array_decodes_to_empty_set() {
    let (_engine, converter) = fixture();
    assert!(converter.to_entity_value(None).unwrap().is_empty());
}

#[test]
fn absent_set_encodes_to_null() {
    let (_engine, converter) = fixture();
    assert!(converter.to_persisted_value(None).unwrap().is_none());
}

#[test]
fn empty_set_encodes_to_zero_length_array() {
    let (_engine, converter) = fixture();
    let empty = BTreeSet::new();

    let array = converter.to_persisted_value(Some(&empty)).unwrap().unwrap();

    assert!(array.text_elements().unwrap().is_empty());
    assert!(converter.to_entity_value(Some(&array)).unwrap().is_empty());
}

#[test]
fn unrecognized_element_fails_decode() {
    let (engine, converter) = fixture();
    let conn = engine.connect().unwrap();
    let array = conn
        .create_array(TAG_ELEMENT_TYPE, &strings(&["QA", "NOT_A_TAG"]))
        .unwrap();

    let err = converter.to_entity_value(Some(&array)).unwrap_err();

    assert!(matches!(err, Error::UnknownTag(ref raw) if raw == "NOT_A_TAG"));
}

// Symbolic names are matched exactly; a lowercase element is drifted
// data, not an alias.
#[test]
fn lowercase_element_fails_decode() {
    let (engine, converter) = fixture();
    let conn = engine.connect().unwrap();
    let array = conn
        .create_array(TAG_ELEMENT_TYPE, &strings(&["qa"]))
        .unwrap();

    let err = converter.to_entity_value(Some(&array)).unwrap_err();
    assert!(matches!(err, Error::UnknownTag(ref raw) if raw == "qa"));
}

#[test]
fn duplicate_elements_collapse() {
    let (engine, converter) = fixture();
    let conn = engine.connect().unwrap();
    let array = conn
        .create_array(TAG_ELEMENT_TYPE, &strings(&["QA", "QA", "BUG"]))
        .unwrap();

    let decoded = converter.to_entity_value(Some(&array)).unwrap();

    assert_eq!(decoded, tag_set(&[Tag::Qa, Tag::Bug]));
}

#[test]
fn extraction_failure_is_data_access_error() {
    let (engine, converter) = fixture();
    let array = converter
        .to_persisted_value(Some(&tag_set(&[Tag::Qa])))
        .unwrap()
        .unwrap();

    engine.close();

    let err = converter.to_entity_value(Some(&array)).unwrap_err();
    assert!(err.to_string().contains("Can't get array value"));
    assert!(matches!(
        err,
        Error::DataAccess {
            source: DriverError::Closed,
            ..
        }
    ));
}

#[test]
fn encode_fails_when_element_type_unregistered() {
    // Engine without the "tag" element type: the driver rejects the
    // construction call and the failure surfaces unchanged.
    let engine = Engine::open();
    let pool = Pool::new(engine.clone(), PoolConfig::default()).unwrap();
    let converter = TagArrayConverter::new(pool);

    let err = converter
        .to_persisted_value(Some(&tag_set(&[Tag::Qa])))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Driver(DriverError::UnknownElementType(ref t)) if t == TAG_ELEMENT_TYPE
    ));
}

#[test]
fn encode_does_not_mutate_input() {
    let (_engine, converter) = fixture();
    let set = tag_set(&[Tag::Qa, Tag::Bug]);
    let before = set.clone();

    converter.to_persisted_value(Some(&set)).unwrap();

    assert_eq!(set, before);
}

#[test]
fn concurrent_conversions_are_independent() {
    let (_engine, converter) = fixture();

    std::thread::scope(|s| {
        for worker in 0..8 {
            let converter = converter.clone();
            s.spawn(move || {
                let set = tag_set(&ALL_TAGS[..=worker % ALL_TAGS.len()]);
                for _ in 0..20 {
                    let array = converter.to_persisted_value(Some(&set)).unwrap().unwrap();
                    let decoded = converter.to_entity_value(Some(&array)).unwrap();
                    assert_eq!(decoded, set);
                }
            });
        }
    });
}
