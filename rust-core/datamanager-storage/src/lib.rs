// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DataManager record stores
//
// This crate turns store configurations into live, named record stores. The
// `Adapter` trait is the contract every backend satisfies; the `Registry`
// picks a backend for each config (falling back when the requested one is
// unavailable) and hands out the resulting stores by name.
//
// # Modules
//
// - [`adapter`] -- The `Adapter` trait, `BackendKind` and `SaveOptions`.
// - [`config`] -- Store configs, settings and input normalisation.
// - [`error`] -- The `StoreError` enum.
// - [`selector`] -- Capability table and backend fallback.
// - [`registry`] -- Named store registry and the process-wide instance.
// - [`memory`] -- In-memory adapter.
// - [`session_local`] -- Adapter persisting to a key/value storage area.
// - [`storage_area`] -- Session and file-backed key/value areas.
// - [`redb_backend`] -- IndexedDB adapter on redb (feature `redb-backend`).
// - [`sqlite_backend`] -- WebSQL adapter on SQLite (feature `sqlite-backend`).
// - [`crypto`] -- Pluggable record encryption.
// - [`metrics`] -- A transparent wrapper that collects operation statistics.
//
// # Example
//
// ```rust
// use datamanager_model::{FilterSpec, Record};
// use datamanager_storage::{BackendKind, Capabilities, Registry, SaveOptions};
//
// # tokio_test::block_on(async {
// let registry = Registry::with_capabilities(Capabilities::from_kinds([BackendKind::Memory]));
// registry.add("tasks").unwrap();
//
// let tasks = registry.store("tasks").unwrap();
// tasks
//     .save(
//         vec![
//             Record::new().with("id", 1).with("user", "admin"),
//             Record::new().with("id", 2).with("user", "bob"),
//         ]
//         .into(),
//         SaveOptions::default(),
//     )
//     .await
//     .unwrap();
//
// let admins = tasks
//     .filter(Some(&FilterSpec::new().with("user", "admin")), false)
//     .await
//     .unwrap();
// assert_eq!(admins.len(), 1);
// # });
// ```

pub mod adapter;
pub mod config;
pub mod crypto;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod registry;
pub mod selector;
pub mod session_local;
pub mod storage_area;

#[cfg(any(feature = "redb-backend", feature = "sqlite-backend"))]
mod connection;

// Optional persistent backends, feature-gated.
#[cfg(feature = "redb-backend")]
pub mod redb_backend;
#[cfg(feature = "sqlite-backend")]
pub mod sqlite_backend;

pub use adapter::{Adapter, BackendKind, SaveOptions};
pub use config::{StorageType, StoreConfig, StoreEntry, StoreInput, StoreSettings};
pub use crypto::{CryptoSettings, FnCipher, RecordCipher};
pub use error::StoreError;
pub use memory::MemoryAdapter;
pub use metrics::{AdapterStats, MetricsAdapter};
pub use registry::{global, Registry};
pub use selector::{select, Capabilities, Selection, DEFAULT_PREFERRED};
pub use session_local::SessionLocalAdapter;
pub use storage_area::{FileArea, MemoryArea, StorageArea};

#[cfg(feature = "redb-backend")]
pub use redb_backend::IndexedDbAdapter;
#[cfg(feature = "sqlite-backend")]
pub use sqlite_backend::WebSqlAdapter;
