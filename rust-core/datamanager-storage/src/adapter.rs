// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The adapter contract every DataManager backend satisfies.
//
// A store is an `Adapter`: one named record collection with CRUD and filter
// operations. The in-memory adapter completes every operation inside the
// call; the persistent adapters suspend on their database work. Both are
// driven through the same async interface so callers never special-case a
// backend.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;

use datamanager_model::{Batch, FilterSpec, Record, Removal};

use crate::error::StoreError;

/// The backend kinds a store can be created with.
///
/// The configuration names are the historical ones (`"IndexedDB"`,
/// `"WebSQL"`, ...). `IndexedDb` is served by an embedded redb object store
/// and `WebSql` by an embedded SQLite table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Memory,
    SessionLocal,
    IndexedDb,
    WebSql,
}

impl BackendKind {
    /// Every kind, in declaration order.
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Memory,
        BackendKind::SessionLocal,
        BackendKind::IndexedDb,
        BackendKind::WebSql,
    ];

    /// Configuration name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Memory => "Memory",
            BackendKind::SessionLocal => "SessionLocal",
            BackendKind::IndexedDb => "IndexedDB",
            BackendKind::WebSql => "WebSQL",
        }
    }

    /// Run this kind's capability probe.
    pub fn is_valid(self) -> bool {
        match self {
            BackendKind::Memory => crate::memory::MemoryAdapter::is_valid(),
            BackendKind::SessionLocal => crate::session_local::SessionLocalAdapter::is_valid(),
            #[cfg(feature = "redb-backend")]
            BackendKind::IndexedDb => crate::redb_backend::IndexedDbAdapter::is_valid(),
            #[cfg(feature = "sqlite-backend")]
            BackendKind::WebSql => crate::sqlite_backend::WebSqlAdapter::is_valid(),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    /// Kinds backed by a transactional database with an explicit `open()`.
    pub fn is_transactional(self) -> bool {
        matches!(self, BackendKind::IndexedDb | BackendKind::WebSql)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::UnknownBackend(s.to_string()))
    }
}

/// Options for [`Adapter::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Replace the whole collection with the saved data.
    pub reset: bool,
}

impl SaveOptions {
    pub fn reset() -> Self {
        Self { reset: true }
    }
}

/// A named record store over one backend.
///
/// Every operation returns the store's post-operation view: `save` and
/// `remove` return the full collection, `read` and `filter` the selected
/// records. Errors from the underlying database are returned as-is and never
/// retried.
///
/// Operations on one store are not serialised against each other; callers
/// that need ordering between overlapping writes must await one before
/// issuing the next.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Store name, unique within a registry.
    fn name(&self) -> &str;

    /// Backend kind serving this store.
    fn kind(&self) -> BackendKind;

    /// Field used as the record key.
    fn record_id(&self) -> &str;

    /// Capability probe: whether this backend is usable in the current
    /// environment. Called once per kind when a registry is created.
    fn is_valid() -> bool
    where
        Self: Sized;

    /// Acquire the underlying storage handle. Idempotent.
    async fn open(&self) -> Result<(), StoreError>;

    /// Release the storage handle, best effort.
    async fn close(&self);

    /// Records with key `id`, or every record when `id` is `None`.
    async fn read(&self, id: Option<&Value>) -> Result<Vec<Record>, StoreError>;

    /// Upsert records by key, or replace everything when `options.reset`.
    async fn save(&self, data: Batch, options: SaveOptions) -> Result<Vec<Record>, StoreError>;

    /// Delete records by key, or everything for [`Removal::All`].
    async fn remove(&self, removal: Removal) -> Result<Vec<Record>, StoreError>;

    /// Records matching `spec` in collection order; no spec returns all.
    async fn filter(
        &self,
        spec: Option<&FilterSpec>,
        match_any: bool,
    ) -> Result<Vec<Record>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = "LocalForage".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, StoreError::UnknownBackend(name) if name == "LocalForage"));
    }

    #[test]
    fn test_kind_names_are_case_sensitive() {
        assert!("indexeddb".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_memory_always_valid() {
        assert!(BackendKind::Memory.is_valid());
    }

    #[test]
    fn test_transactional_kinds() {
        assert!(BackendKind::IndexedDb.is_transactional());
        assert!(BackendKind::WebSql.is_transactional());
        assert!(!BackendKind::Memory.is_transactional());
        assert!(!BackendKind::SessionLocal.is_transactional());
    }

    #[test]
    fn test_save_options() {
        assert!(!SaveOptions::default().reset);
        assert!(SaveOptions::reset().reset);
    }
}
