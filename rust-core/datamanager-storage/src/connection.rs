// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared plumbing for the transactional adapters (IndexedDB on redb, WebSQL
// on SQLite): the lazily-opened database handle and the canonical key
// encoding both use.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Number, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;

/// A database handle slot.
///
/// Empty until `open_with` succeeds; `close` empties it again. Operations
/// ask for the handle through [`Connection::handle`], which opens on demand
/// only when the store was configured with `auto`.
pub(crate) struct Connection<H> {
    store: String,
    auto: bool,
    slot: Mutex<Option<Arc<H>>>,
}

impl<H: Send + Sync> Connection<H> {
    pub(crate) fn new(store: impl Into<String>, auto: bool) -> Self {
        Self {
            store: store.into(),
            auto,
            slot: Mutex::new(None),
        }
    }

    /// Return the open handle, opening it with `open` first if needed.
    /// Opening an already-open connection is a no-op.
    pub(crate) async fn open_with<F, Fut>(&self, open: F) -> Result<Arc<H>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H, StoreError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }
        let handle = Arc::new(open().await?);
        debug!(store = %self.store, "opened database");
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Handle for an operation: the open handle, or a fresh one when `auto`
    /// is set, or [`StoreError::NotOpen`].
    pub(crate) async fn handle<F, Fut>(&self, open: F) -> Result<Arc<H>, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<H, StoreError>>,
    {
        if !self.auto {
            return self
                .slot
                .lock()
                .await
                .as_ref()
                .map(Arc::clone)
                .ok_or_else(|| StoreError::NotOpen(self.store.clone()));
        }
        self.open_with(open).await
    }

    /// Drop the handle. Returns whether one was open.
    pub(crate) async fn close(&self) -> bool {
        let closed = self.slot.lock().await.take().is_some();
        if closed {
            debug!(store = %self.store, "closed database");
        }
        closed
    }

    pub(crate) async fn is_open(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

/// Canonical text form of a record key, used as the primary key column or
/// object-store key.
///
/// Integral numbers print without a fraction, so `1` and `1.0` address the
/// same row. Strings and other values use their JSON text, which keeps the
/// number `1` and the string `"1"` apart. An absent key is the empty string.
/// Records never store under an object or array key (those records are
/// keyless), so looking one up finds no row.
pub(crate) fn key_text(key: Option<&Value>) -> String {
    match key {
        None => String::new(),
        Some(Value::Number(n)) => canonical_number(n),
        Some(other) => other.to_string(),
    }
}

fn canonical_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // Below 2^53 every integral f64 converts to i64 exactly.
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
