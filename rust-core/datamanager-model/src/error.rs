// SPDX-License-Identifier: PMPL-1.0-or-later
//! Model error types.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while converting loose JSON into model types.
///
/// The matcher and mutation engine themselves never fail: malformed filter
/// or removal input is skipped, not rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("{context} must be a JSON object, found {found}")]
    NotAnObject {
        /// What was being converted (e.g. "record", "filter spec").
        context: &'static str,
        /// JSON type name of the rejected value.
        found: &'static str,
    },
}

impl ModelError {
    pub(crate) fn not_an_object(context: &'static str, value: &Value) -> Self {
        ModelError::NotAnObject {
            context,
            found: json_type_name(value),
        }
    }
}

/// Name of a JSON value's type, for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
