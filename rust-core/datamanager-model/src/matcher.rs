// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query matcher.
//!
//! Pure evaluation of a [`FilterSpec`] against one record. Entries combine
//! with AND unless `match_any` is set, in which case they combine with OR.
//! Evaluation stops at the first decisive entry.
//!
//! An empty spec is never routed here: callers treat "no spec" as "the whole
//! collection" (see [`crate::Collection::filter`]).

use serde_json::Value;

use crate::filter::{Criterion, FilterSpec};
use crate::record::{strict_eq, Record};

/// Evaluate `spec` against `record` under the global match mode.
pub fn matches(record: &Record, spec: &FilterSpec, match_any: bool) -> bool {
    for (field, criterion) in spec.iter() {
        let hit = entry_matches(record.get(field), criterion, match_any);
        if match_any && hit {
            return true;
        }
        if !match_any && !hit {
            return false;
        }
    }
    !match_any
}

/// Evaluate one `(field, criterion)` entry against the record's field value.
///
/// `global_any` is consulted only for bare criteria against sequence fields;
/// multi-value criteria carry their own mode.
pub fn entry_matches(value: Option<&Value>, criterion: &Criterion, global_any: bool) -> bool {
    match criterion {
        Criterion::Multi { data, match_any } => multi_matches(value, data, *match_any),
        Criterion::Exact(expected) | Criterion::Path(expected) => {
            if let Some(Value::Array(items)) = value {
                // Element-wise: under AND every element must equal the
                // criterion, so a multi-element field rarely matches.
                return sequence_matches(items, expected, global_any);
            }
            match criterion {
                Criterion::Path(path) => traverse(path, value),
                _ => value.is_some_and(|v| strict_eq(expected, v)),
            }
        }
    }
}

fn sequence_matches(items: &[Value], expected: &Value, any: bool) -> bool {
    if items.is_empty() {
        return false;
    }
    if any {
        items.iter().any(|item| strict_eq(expected, item))
    } else {
        items.iter().all(|item| strict_eq(expected, item))
    }
}

fn multi_matches(value: Option<&Value>, data: &[Value], any: bool) -> bool {
    let single = |candidate: &Value| match value {
        Some(Value::Array(items)) => sequence_matches(items, candidate, false),
        _ if candidate.is_object() || candidate.is_array() => traverse(candidate, value),
        Some(v) => strict_eq(candidate, v),
        None => false,
    };

    if let Some(Value::Array(items)) = value {
        if items.is_empty() {
            return false;
        }
        if same_members(items, data) {
            return true;
        }
        if any {
            return data
                .iter()
                .any(|candidate| items.iter().any(|item| strict_eq(candidate, item)));
        }
    }

    if any {
        data.iter().any(single)
    } else {
        data.iter().all(single)
    }
}

/// True when both sequences hold the same set of values, ignoring order
/// and repetition.
fn same_members(items: &[Value], data: &[Value]) -> bool {
    let contains = |set: &[Value], v: &Value| set.iter().any(|x| strict_eq(x, v));
    items.iter().all(|item| contains(data, item)) && data.iter().all(|d| contains(items, d))
}

/// Partial-path comparison.
///
/// Follows the first key of the criterion at each level, descending into the
/// record value in step, while the criterion is still structured. The path
/// fails when the record side runs out (absent or `null`) before the
/// criterion reaches a leaf; otherwise the two leaves compare strictly.
pub fn traverse(criterion: &Value, value: Option<&Value>) -> bool {
    let mut filter = Some(criterion);
    let mut current = value;

    while let Some(f) = filter.filter(|f| f.is_object() || f.is_array()) {
        match current {
            Some(v) if !v.is_null() => match first_key(f) {
                Some(key) => {
                    filter = child(f, &key);
                    current = child(v, &key);
                }
                None => {
                    filter = None;
                    current = None;
                }
            },
            _ => break,
        }
    }

    match (filter, current) {
        (None, None) => true,
        (Some(f), Some(v)) => strict_eq(f, v),
        _ => false,
    }
}

fn first_key(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => obj.keys().next().cloned(),
        Value::Array(items) if !items.is_empty() => Some("0".to_string()),
        _ => None,
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(obj) => obj.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn spec(value: Value) -> FilterSpec {
        FilterSpec::from_value(value).unwrap()
    }

    #[test]
    fn test_exact_and_or() {
        let admin = rec(json!({"id": 1, "user": "admin", "date": "2012-08-01"}));
        let bob = rec(json!({"id": 2, "user": "bob", "date": "2012-08-01"}));
        let f = spec(json!({"user": "admin", "date": "2012-08-01"}));

        assert!(matches(&admin, &f, false));
        assert!(!matches(&bob, &f, false));
        assert!(matches(&admin, &f, true));
        assert!(matches(&bob, &f, true));
    }

    #[test]
    fn test_missing_field_never_matches_exact() {
        let r = rec(json!({"id": 1}));
        assert!(!matches(&r, &spec(json!({"user": "admin"})), false));
        assert!(!matches(&r, &spec(json!({"user": null})), false));
    }

    #[test]
    fn test_null_field_matches_null() {
        let r = rec(json!({"user": null}));
        assert!(matches(&r, &spec(json!({"user": null})), false));
    }

    #[test]
    fn test_nested_path() {
        let nyc = rec(json!({"profile": {"address": {"city": "NYC", "zip": "10001"}}}));
        let la = rec(json!({"profile": {"address": {"city": "LA"}}}));
        let f = spec(json!({"profile": {"address": {"city": "NYC"}}}));

        assert!(matches(&nyc, &f, false));
        assert!(!matches(&la, &f, false));
    }

    #[test]
    fn test_nested_path_stops_at_null() {
        let r = rec(json!({"profile": {"address": null}}));
        let f = spec(json!({"profile": {"address": {"city": "NYC"}}}));
        assert!(!matches(&r, &f, false));
    }

    #[test]
    fn test_nested_path_uses_first_key_only() {
        let r = rec(json!({"profile": {"city": "NYC", "zip": "00000"}}));
        let f = spec(json!({"profile": {"city": "NYC", "zip": "10001"}}));
        assert!(matches(&r, &f, false));
    }

    #[test]
    fn test_nested_leaf_against_structured_value_fails() {
        let r = rec(json!({"profile": {"address": {"city": "NYC"}}}));
        let f = spec(json!({"profile": {"address": "NYC"}}));
        assert!(!matches(&r, &f, false));
    }

    #[test]
    fn test_bare_scalar_against_sequence() {
        let same = rec(json!({"tags": ["a", "a"]}));
        let mixed = rec(json!({"tags": ["a", "b"]}));
        let empty = rec(json!({"tags": []}));
        let f = spec(json!({"tags": "a"}));

        // AND degenerates to "every element equals the scalar".
        assert!(matches(&same, &f, false));
        assert!(!matches(&mixed, &f, false));
        assert!(matches(&mixed, &f, true));
        assert!(!matches(&empty, &f, false));
        assert!(!matches(&empty, &f, true));
    }

    #[test]
    fn test_multi_any_scalar_field() {
        let r = rec(json!({"status": "open"}));
        let f = FilterSpec::new().with("status", Criterion::any_of(["closed", "open"]));
        assert!(matches(&r, &f, false));

        let f = FilterSpec::new().with("status", Criterion::any_of(["closed", "done"]));
        assert!(!matches(&r, &f, false));
    }

    #[test]
    fn test_multi_all_scalar_field() {
        let r = rec(json!({"status": "open"}));
        let f = FilterSpec::new().with("status", Criterion::all_of(["open", "open"]));
        assert!(matches(&r, &f, false));

        let f = FilterSpec::new().with("status", Criterion::all_of(["open", "closed"]));
        assert!(!matches(&r, &f, false));
    }

    #[test]
    fn test_multi_against_sequence() {
        let r = rec(json!({"tags": ["rust", "db"]}));

        let any = FilterSpec::new().with("tags", Criterion::any_of(["go", "db"]));
        assert!(matches(&r, &any, false));

        let none = FilterSpec::new().with("tags", Criterion::any_of(["go", "c"]));
        assert!(!matches(&r, &none, false));

        let all = FilterSpec::new().with("tags", Criterion::all_of(["rust", "db"]));
        assert!(matches(&r, &all, false));

        let reordered = FilterSpec::new().with("tags", Criterion::all_of(["db", "rust", "db"]));
        assert!(matches(&r, &reordered, false));

        let subset = FilterSpec::new().with("tags", Criterion::all_of(["rust"]));
        assert!(!matches(&r, &subset, false));

        let superset = FilterSpec::new().with("tags", Criterion::all_of(["rust", "db", "go"]));
        assert!(!matches(&r, &superset, false));

        let uniform = rec(json!({"tags": ["db", "db"]}));
        let all_db = FilterSpec::new().with("tags", Criterion::all_of(["db"]));
        assert!(matches(&uniform, &all_db, false));
    }

    #[test]
    fn test_multi_against_empty_sequence() {
        let r = rec(json!({"tags": []}));
        let f = FilterSpec::new().with("tags", Criterion::any_of(["x"]));
        assert!(!matches(&r, &f, false));
        let f = FilterSpec::new().with("tags", Criterion::all_of(Vec::<Value>::new()));
        assert!(!matches(&r, &f, false));
    }

    #[test]
    fn test_multi_nested_values() {
        let r = rec(json!({"owner": {"name": "ana"}}));
        let f = spec(json!({"owner": {"data": [{"name": "bo"}, {"name": "ana"}], "matchAny": true}}));
        assert!(matches(&r, &f, false));
    }

    #[test]
    fn test_entry_override_of_global_mode() {
        let r = rec(json!({"status": "open", "user": "bob"}));
        let f = FilterSpec::new()
            .with("status", Criterion::any_of(["open", "closed"]))
            .with("user", "bob");
        assert!(matches(&r, &f, false));

        let f = FilterSpec::new()
            .with("status", Criterion::all_of(["open", "closed"]))
            .with("user", "alice");
        assert!(!matches(&r, &f, true));
    }

    #[test]
    fn test_array_criterion_descends_by_index() {
        assert!(traverse(&json!(["a"]), Some(&json!(["a", "b"]))));
        assert!(!traverse(&json!(["b"]), Some(&json!(["a", "b"]))));
    }

    #[test]
    fn test_empty_nested_criterion() {
        assert!(traverse(&json!({}), Some(&json!({"x": 1}))));
        assert!(!traverse(&json!({}), None));
        assert!(!traverse(&json!({}), Some(&Value::Null)));
    }

    #[test]
    fn test_numeric_equality_without_coercion() {
        let r = rec(json!({"n": 1}));
        assert!(matches(&r, &spec(json!({"n": 1.0})), false));
        assert!(!matches(&r, &spec(json!({"n": "1"})), false));
    }
}
