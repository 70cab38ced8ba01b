// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the record model, matcher and mutation engine

use datamanager_model::{matches, Collection, FilterSpec, Record, Removal};
use proptest::prelude::*;
use serde_json::Value;

/// Generate arbitrary scalar field values
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Generate a record with the given id and a few scalar fields
fn arb_record_with_id(id: u16) -> impl Strategy<Value = Record> {
    prop::collection::btree_map("[a-e]", arb_scalar(), 0..4).prop_map(move |fields| {
        let mut record = Record::new().with("id", id);
        for (field, value) in fields {
            record.insert(field, value);
        }
        record
    })
}

fn arb_record() -> impl Strategy<Value = Record> {
    any::<u16>().prop_flat_map(arb_record_with_id)
}

/// Generate a collection of records with unique ids
fn arb_collection() -> impl Strategy<Value = Collection> {
    prop::collection::btree_set(any::<u16>(), 0..16)
        .prop_flat_map(|ids| {
            ids.into_iter()
                .map(arb_record_with_id)
                .collect::<Vec<_>>()
        })
        .prop_map(|records| {
            let mut collection = Collection::default();
            collection.save(records, false);
            collection
        })
}

proptest! {
    #[test]
    fn test_filter_without_spec_is_identity(collection in arb_collection(), any_mode in any::<bool>()) {
        prop_assert_eq!(collection.filter(None, any_mode), collection.records().to_vec());
    }

    #[test]
    fn test_own_field_always_matches(record in arb_record()) {
        for (field, value) in record.fields() {
            let spec = FilterSpec::new().with(field.clone(), value.clone());
            prop_assert!(matches(&record, &spec, false), "field {} did not match itself", field);
        }
    }

    #[test]
    fn test_remove_is_idempotent(collection in arb_collection(), target in any::<u16>()) {
        let mut once = collection.clone();
        once.remove(&Removal::key(target));
        let mut twice = once.clone();
        twice.remove(&Removal::key(target));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_save_existing_key_keeps_length(collection in arb_collection(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!collection.is_empty());
        let existing = &collection.records()[pick.index(collection.len())];
        let key = existing.key("id").cloned().unwrap_or(Value::Null);

        let mut updated = collection.clone();
        updated.save(Record::new().with("id", key.clone()).with("changed", true), false);

        prop_assert_eq!(updated.len(), collection.len());
        let position = collection.position(Some(&key));
        prop_assert_eq!(updated.position(Some(&key)), position);
    }

    #[test]
    fn test_save_fresh_key_appends(collection in arb_collection()) {
        let fresh = Value::from("fresh-key");
        let mut updated = collection.clone();
        updated.save(Record::new().with("id", fresh.clone()), false);

        prop_assert_eq!(updated.len(), collection.len() + 1);
        prop_assert_eq!(updated.records().last().and_then(|r| r.key("id")), Some(&fresh));
    }

    #[test]
    fn test_reset_yields_exactly_the_data(
        collection in arb_collection(),
        data in prop::collection::vec(arb_record(), 0..8)
    ) {
        let mut reset = collection;
        reset.save(data.clone(), true);
        prop_assert_eq!(reset.records(), data.as_slice());
    }

    #[test]
    fn test_and_or_duality(
        record in arb_record(),
        a in arb_scalar(),
        b in arb_scalar()
    ) {
        let spec = FilterSpec::new().with("a", a.clone()).with("b", b.clone());
        let only_a = FilterSpec::new().with("a", a);
        let only_b = FilterSpec::new().with("b", b);

        let hit_a = matches(&record, &only_a, false);
        let hit_b = matches(&record, &only_b, false);

        prop_assert_eq!(matches(&record, &spec, false), hit_a && hit_b);
        prop_assert_eq!(matches(&record, &spec, true), hit_a || hit_b);
    }
}
