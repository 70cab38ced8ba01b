// SPDX-License-Identifier: PMPL-1.0-or-later
//! Filter specifications.
//!
//! A [`FilterSpec`] maps field names to [`Criterion`] values. Loose JSON is
//! classified once on the way in, so the matcher works on explicit variants:
//!
//! - a scalar is an exact match,
//! - an object or array is a partial-path match,
//! - an object carrying a `data` array is a multi-value test, with its own
//!   optional `matchAny` flag.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ModelError;

/// How one filter entry is tested against a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Strict equality with a scalar field value.
    Exact(Value),
    /// Descend into the field value along the criterion's first key at each
    /// level until the criterion reaches a leaf, then compare strictly.
    Path(Value),
    /// Test several values against the same field. `match_any` overrides the
    /// global match mode for this entry only.
    Multi { data: Vec<Value>, match_any: bool },
}

impl Criterion {
    /// Multi-value criterion satisfied when any value matches.
    pub fn any_of<I, V>(data: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Criterion::Multi {
            data: data.into_iter().map(Into::into).collect(),
            match_any: true,
        }
    }

    /// Multi-value criterion satisfied only when every value matches.
    pub fn all_of<I, V>(data: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Criterion::Multi {
            data: data.into_iter().map(Into::into).collect(),
            match_any: false,
        }
    }

    /// Classify a loose JSON criterion.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut obj) if obj.get("data").is_some_and(Value::is_array) => {
                let match_any = matches!(obj.get("matchAny"), Some(Value::Bool(true)));
                let data = match obj.remove("data") {
                    Some(Value::Array(data)) => data,
                    _ => Vec::new(),
                };
                Criterion::Multi { data, match_any }
            }
            value @ (Value::Object(_) | Value::Array(_)) => Criterion::Path(value),
            scalar => Criterion::Exact(scalar),
        }
    }

    /// JSON form, the inverse of [`Criterion::from_value`].
    pub fn to_value(&self) -> Value {
        match self {
            Criterion::Exact(value) | Criterion::Path(value) => value.clone(),
            Criterion::Multi { data, match_any } => {
                let mut obj = Map::new();
                obj.insert("data".to_string(), Value::Array(data.clone()));
                obj.insert("matchAny".to_string(), Value::Bool(*match_any));
                Value::Object(obj)
            }
        }
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Criterion::from_value(value)
    }
}

impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

impl From<String> for Criterion {
    fn from(value: String) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

impl From<i64> for Criterion {
    fn from(value: i64) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

impl From<i32> for Criterion {
    fn from(value: i32) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

impl From<u64> for Criterion {
    fn from(value: u64) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

impl From<f64> for Criterion {
    fn from(value: f64) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

impl From<bool> for Criterion {
    fn from(value: bool) -> Self {
        Criterion::Exact(Value::from(value))
    }
}

/// Per-field criteria used to select a subset of a collection.
///
/// Entries keep insertion order; the matcher short-circuits in that order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct FilterSpec {
    entries: Vec<(String, Criterion)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-entry spec selecting records whose key field equals `id`.
    pub fn by_key(record_id: &str, id: Value) -> Self {
        Self::new().with(record_id, Criterion::from_value(id))
    }

    /// Builder-style [`FilterSpec::insert`].
    pub fn with(mut self, field: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        self.insert(field, criterion);
        self
    }

    /// Add an entry. A second criterion for the same field replaces the first
    /// in place.
    pub fn insert(&mut self, field: impl Into<String>, criterion: impl Into<Criterion>) {
        let field = field.into();
        let criterion = criterion.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = criterion,
            None => self.entries.push((field, criterion)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries.iter().map(|(field, c)| (field.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a JSON object of `field -> criterion`.
    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        match value {
            Value::Object(obj) => Ok(Self {
                entries: obj
                    .into_iter()
                    .map(|(field, raw)| (field, Criterion::from_value(raw)))
                    .collect(),
            }),
            other => Err(ModelError::not_an_object("filter spec", &other)),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(field, c)| (field.clone(), c.to_value()))
                .collect(),
        )
    }
}

impl TryFrom<Value> for FilterSpec {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        FilterSpec::from_value(value)
    }
}

impl Serialize for FilterSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
