// SPDX-License-Identifier: PMPL-1.0-or-later
//! Record model.
//!
//! A record is an open JSON mapping. One field, the key field (`"id"` unless
//! the store says otherwise), identifies it within a collection. A record
//! without that field has an absent key, which is still a legal key: all
//! keyless records share the same slot. Only scalars and `null` are keys; a
//! key field holding an object or array counts as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;

/// Key field used when a store does not configure one.
pub const DEFAULT_RECORD_ID: &str = "id";

/// One structured data item in a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Value of the key field, or `None` when the record has no key.
    pub fn key(&self, record_id: &str) -> Option<&Value> {
        self.0.get(record_id).filter(|v| is_key_value(v))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ModelError::not_an_object("record", &other)),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Whether `value` can act as a record key.
pub fn is_key_value(value: &Value) -> bool {
    !value.is_object() && !value.is_array()
}

/// Strict value equality, without type coercion.
///
/// Numbers compare by numeric value (`1` equals `1.0`). Arrays and objects are
/// never equal to anything: a structured value only matches through path
/// descent, not as a leaf.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        _ => false,
    }
}

/// Key equality. Two absent keys are equal; absent never equals present.
pub fn keys_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => strict_eq(a, b),
        _ => false,
    }
}

/// Records handed to a save: one record or many, always applied as a sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch(Vec<Record>);

impl Batch {
    pub fn new(records: Vec<Record>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[Record] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.0
    }
}

impl From<Record> for Batch {
    fn from(record: Record) -> Self {
        Self(vec![record])
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Self(records)
    }
}

impl TryFrom<Value> for Batch {
    type Error = ModelError;

    /// An object becomes a single-record batch; an array must hold objects.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(Record::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Record::try_from(other).map(Self::from),
        }
    }
}

impl IntoIterator for Batch {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn test_key_extraction() {
        let r = rec(json!({"id": 7, "title": "a"}));
        assert_eq!(r.key(DEFAULT_RECORD_ID), Some(&json!(7)));
        assert_eq!(r.key("customId"), None);
    }

    #[test]
    fn test_structured_key_is_absent() {
        let r = Record::new().with("id", json!({"a": 1})).with("n", 1);
        assert_eq!(r.key("id"), None);
        assert_eq!(r.get("id"), Some(&json!({"a": 1})));
        assert_eq!(Record::new().with("id", json!([1])).key("id"), None);
        assert_eq!(Record::new().with("id", Value::Null).key("id"), Some(&Value::Null));
    }

    #[test]
    fn test_custom_key_field() {
        let r = rec(json!({"customId": "abc"}));
        assert_eq!(r.key("customId"), Some(&json!("abc")));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Record::try_from(json!("nope")).is_err());
        assert!(Record::try_from(json!([{"id": 1}])).is_err());
    }

    #[test]
    fn test_strict_eq_numbers() {
        assert!(strict_eq(&json!(1), &json!(1.0)));
        assert!(strict_eq(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!strict_eq(&json!(1), &json!(2)));
    }

    #[test]
    fn test_strict_eq_no_coercion() {
        assert!(!strict_eq(&json!(1), &json!("1")));
        assert!(!strict_eq(&json!(0), &json!(false)));
        assert!(!strict_eq(&json!(null), &json!(false)));
    }

    #[test]
    fn test_strict_eq_structured_never_equal() {
        assert!(!strict_eq(&json!({"a": 1}), &json!({"a": 1})));
        assert!(!strict_eq(&json!([1]), &json!([1])));
    }

    #[test]
    fn test_keys_equal_absent() {
        assert!(keys_equal(None, None));
        assert!(!keys_equal(None, Some(&json!(1))));
        assert!(!keys_equal(Some(&json!(null)), None));
    }

    #[test]
    fn test_batch_from_value() {
        let single = Batch::try_from(json!({"id": 1})).unwrap();
        assert_eq!(single.len(), 1);

        let many = Batch::try_from(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(many.len(), 2);

        assert!(Batch::try_from(json!([{"id": 1}, 3])).is_err());
    }

    #[test]
    fn test_builder() {
        let r = Record::new().with("id", 1).with("title", "x");
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("title"), Some(&json!("x")));
    }
}
