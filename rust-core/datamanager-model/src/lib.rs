// SPDX-License-Identifier: PMPL-1.0-or-later
//! DataManager record model
//!
//! The storage-independent core of a DataManager store: the record model, the
//! structural filter matcher and the mutation engine. Every backend in
//! `datamanager-storage` either holds a [`Collection`] directly or
//! materialises one from its rows before filtering.
//!
//! ```rust
//! use datamanager_model::{Collection, FilterSpec, Record, Removal};
//! use serde_json::json;
//!
//! let mut tasks = Collection::default();
//! tasks.save(
//!     vec![
//!         Record::try_from(json!({"id": 1, "user": "admin"})).unwrap(),
//!         Record::try_from(json!({"id": 2, "user": "bob"})).unwrap(),
//!     ],
//!     false,
//! );
//!
//! let admins = tasks.filter(Some(&FilterSpec::new().with("user", "admin")), false);
//! assert_eq!(admins.len(), 1);
//!
//! tasks.remove(&Removal::key(1));
//! assert_eq!(tasks.len(), 1);
//! ```

pub mod error;
pub mod filter;
pub mod matcher;
pub mod mutation;
pub mod record;

pub use error::ModelError;
pub use filter::{Criterion, FilterSpec};
pub use matcher::matches;
pub use mutation::{Collection, Removal, Target};
pub use record::{is_key_value, keys_equal, strict_eq, Batch, Record, DEFAULT_RECORD_ID};
