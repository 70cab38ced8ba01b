// SPDX-License-Identifier: PMPL-1.0-or-later
//! Mutation engine.
//!
//! A [`Collection`] is the ordered record set owned by one store. Saves
//! upsert by key, removals delete by key, and neither rejects malformed
//! input: a keyless record occupies the "absent key" slot and an
//! unresolvable removal target is skipped.

use serde_json::Value;
use tracing::trace;

use crate::filter::FilterSpec;
use crate::matcher::matches;
use crate::record::{is_key_value, keys_equal, Batch, Record, DEFAULT_RECORD_ID};

/// One thing to remove: a raw key, or a record whose key field is used.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Key(Value),
    Record(Record),
}

impl Target {
    /// Resolve to a key. A record without the key field, or a structured
    /// raw key, resolves to nothing.
    pub fn resolve(&self, record_id: &str) -> Option<&Value> {
        match self {
            Target::Key(key) => Some(key).filter(|k| is_key_value(k)),
            Target::Record(record) => record.key(record_id),
        }
    }

    /// Classify a loose JSON target. Objects are records, scalars are keys;
    /// `null` and nested arrays are unresolvable.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null | Value::Array(_) => None,
            Value::Object(map) => Some(Target::Record(Record::from(map))),
            scalar => Some(Target::Key(scalar)),
        }
    }
}

/// What a remove call should delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Removal {
    /// Empty the collection.
    #[default]
    All,
    Targets(Vec<Target>),
}

impl Removal {
    pub fn key(key: impl Into<Value>) -> Self {
        Removal::Targets(vec![Target::Key(key.into())])
    }

    pub fn keys<I, V>(keys: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Removal::Targets(keys.into_iter().map(|k| Target::Key(k.into())).collect())
    }

    pub fn records(records: impl IntoIterator<Item = Record>) -> Self {
        Removal::Targets(records.into_iter().map(Target::Record).collect())
    }

    /// Classify loose input: absent or `null` removes everything, an array is
    /// a list of targets, anything else is a single target.
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Removal::All,
            Some(Value::Array(items)) => {
                Removal::Targets(items.into_iter().filter_map(Target::from_value).collect())
            }
            Some(single) => Removal::Targets(Target::from_value(single).into_iter().collect()),
        }
    }

    /// Keys to delete, or `None` for [`Removal::All`]. Unresolvable targets
    /// are dropped.
    pub fn resolved_keys(&self, record_id: &str) -> Option<Vec<&Value>> {
        match self {
            Removal::All => None,
            Removal::Targets(targets) => Some(
                targets
                    .iter()
                    .filter_map(|target| target.resolve(record_id))
                    .collect(),
            ),
        }
    }
}

impl From<Target> for Removal {
    fn from(target: Target) -> Self {
        Removal::Targets(vec![target])
    }
}

impl From<Record> for Removal {
    fn from(record: Record) -> Self {
        Removal::Targets(vec![Target::Record(record)])
    }
}

impl From<Vec<Record>> for Removal {
    fn from(records: Vec<Record>) -> Self {
        Removal::records(records)
    }
}

/// An ordered record collection with key-based upsert and removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    record_id: String,
    records: Vec<Record>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_ID)
    }
}

impl Collection {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            records: Vec::new(),
        }
    }

    /// Wrap existing records as-is, e.g. rows materialised from a backend.
    pub fn with_records(record_id: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            record_id: record_id.into(),
            records,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the record whose key equals `key`.
    pub fn position(&self, key: Option<&Value>) -> Option<usize> {
        self.records
            .iter()
            .position(|r| keys_equal(r.key(&self.record_id), key))
    }

    /// Upsert `batch`, or replace the whole collection when `reset` is set.
    ///
    /// Each incoming record replaces the slot holding the same key, or is
    /// appended when no slot matches. Returns the post-mutation collection.
    pub fn save(&mut self, batch: impl Into<Batch>, reset: bool) -> &[Record] {
        let batch = batch.into();
        if reset {
            trace!(count = batch.len(), "resetting collection");
            self.records = batch.into_records();
            return &self.records;
        }

        let (mut updated, mut inserted) = (0usize, 0usize);
        for record in batch {
            match self.position(record.key(&self.record_id)) {
                Some(index) => {
                    self.records[index] = record;
                    updated += 1;
                }
                None => {
                    self.records.push(record);
                    inserted += 1;
                }
            }
        }
        trace!(updated, inserted, "saved records");
        &self.records
    }

    /// Delete every record whose key matches a resolved target.
    pub fn remove(&mut self, removal: &Removal) -> &[Record] {
        let Some(keys) = removal.resolved_keys(&self.record_id) else {
            self.records.clear();
            return &self.records;
        };

        let before = self.records.len();
        let record_id = &self.record_id;
        self.records.retain(|record| {
            let own = record.key(record_id);
            !keys.iter().any(|key| keys_equal(own, Some(key)))
        });
        trace!(removed = before - self.records.len(), "removed records");
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records with key `id`, or the whole collection when `id` is absent.
    /// A structured `id` is never a key and reads nothing.
    pub fn read(&self, id: Option<&Value>) -> Vec<Record> {
        match id {
            Some(id) if !is_key_value(id) => Vec::new(),
            Some(id) => {
                let spec = FilterSpec::by_key(&self.record_id, id.clone());
                self.filter(Some(&spec), false)
            }
            None => self.records.clone(),
        }
    }

    /// Matching records in collection order. No spec, or an empty one,
    /// returns the whole collection without consulting the matcher.
    pub fn filter(&self, spec: Option<&FilterSpec>, match_any: bool) -> Vec<Record> {
        match spec {
            Some(spec) if !spec.is_empty() => self
                .records
                .iter()
                .filter(|record| matches(record, spec, match_any))
                .cloned()
                .collect(),
            _ => self.records.clone(),
        }
    }
}
