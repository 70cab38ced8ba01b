// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory store adapter.
//
// Holds the collection in a tokio `RwLock` and completes every operation
// without suspending on I/O. Data is lost when the last clone is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use datamanager_model::{Batch, Collection, FilterSpec, Record, Removal};

use crate::adapter::{Adapter, BackendKind, SaveOptions};
use crate::config::StoreSettings;
use crate::error::StoreError;

/// A store held entirely in process memory.
///
/// Clones share the same collection.
///
/// # Example
///
/// ```rust
/// use datamanager_model::Record;
/// use datamanager_storage::{Adapter, MemoryAdapter, SaveOptions};
///
/// # tokio_test::block_on(async {
/// let store = MemoryAdapter::new("tasks", "id");
/// store
///     .save(Record::new().with("id", 1).into(), SaveOptions::default())
///     .await
///     .unwrap();
/// assert_eq!(store.read(None).await.unwrap().len(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    name: String,
    record_id: String,
    collection: Arc<RwLock<Collection>>,
}

impl MemoryAdapter {
    pub fn new(name: impl Into<String>, record_id: impl Into<String>) -> Self {
        let record_id = record_id.into();
        Self {
            name: name.into(),
            collection: Arc::new(RwLock::new(Collection::new(record_id.clone()))),
            record_id,
        }
    }

    pub fn from_settings(name: impl Into<String>, settings: &StoreSettings) -> Self {
        Self::new(name, settings.record_id.clone())
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.collection.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.collection.read().await.is_empty()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn record_id(&self) -> &str {
        &self.record_id
    }

    fn is_valid() -> bool {
        true
    }

    async fn open(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}

    async fn read(&self, id: Option<&Value>) -> Result<Vec<Record>, StoreError> {
        Ok(self.collection.read().await.read(id))
    }

    async fn save(&self, data: Batch, options: SaveOptions) -> Result<Vec<Record>, StoreError> {
        let mut collection = self.collection.write().await;
        Ok(collection.save(data, options.reset).to_vec())
    }

    async fn remove(&self, removal: Removal) -> Result<Vec<Record>, StoreError> {
        let mut collection = self.collection.write().await;
        Ok(collection.remove(&removal).to_vec())
    }

    async fn filter(
        &self,
        spec: Option<&FilterSpec>,
        match_any: bool,
    ) -> Result<Vec<Record>, StoreError> {
        Ok(self.collection.read().await.filter(spec, match_any))
    }
}
