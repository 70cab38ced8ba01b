// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SessionLocal store adapter.
//
// Keeps an in-memory mirror of the collection and writes the whole mirror,
// serialized as a JSON array, to a key/value storage area after every
// mutation. If that write fails the mirror is rolled back to the state that
// was last persisted, so the mirror and the area never diverge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use datamanager_model::{Batch, Collection, FilterSpec, Record, Removal};

use crate::adapter::{Adapter, BackendKind, SaveOptions};
use crate::config::{default_data_dir, StorageType, StoreSettings};
use crate::crypto::{self, CryptoSettings};
use crate::error::StoreError;
use crate::storage_area::{session_area, FileArea, StorageArea};

/// Subdirectory of the data directory holding local-storage files.
const LOCAL_AREA_DIR: &str = "local-storage";

/// Storage key for a store: its name followed by the application context
/// with every `/` and `.` replaced by `-`.
///
/// ```rust
/// use datamanager_storage::session_local::storage_key;
///
/// assert_eq!(storage_key("tasks", Some("/app/index.html")), "tasks-app-index-html");
/// assert_eq!(storage_key("tasks", None), "tasks");
/// ```
pub fn storage_key(name: &str, app_context: Option<&str>) -> String {
    let context: String = app_context
        .unwrap_or_default()
        .chars()
        .map(|c| if c == '/' || c == '.' { '-' } else { c })
        .collect();
    format!("{name}{context}")
}

pub struct SessionLocalAdapter {
    name: String,
    record_id: String,
    storage_type: StorageType,
    storage_key: String,
    area: Arc<dyn StorageArea>,
    crypto: Option<CryptoSettings>,
    mirror: RwLock<Collection>,
}

impl SessionLocalAdapter {
    /// Create the store over the area selected by `settings.storage_type`
    /// and load whatever that area already holds for this store.
    pub fn new(name: &str, settings: &StoreSettings) -> Result<Self, StoreError> {
        let area: Arc<dyn StorageArea> = match settings.storage_type {
            StorageType::Session => session_area(),
            StorageType::Local => {
                Arc::new(FileArea::open(settings.resolved_data_dir().join(LOCAL_AREA_DIR))?)
            }
        };
        Self::with_area(name, settings, area)
    }

    /// Create the store over an explicit area.
    pub fn with_area(
        name: &str,
        settings: &StoreSettings,
        area: Arc<dyn StorageArea>,
    ) -> Result<Self, StoreError> {
        let storage_key = storage_key(name, settings.app_context.as_deref());
        let crypto = settings.crypto.clone();

        let mut mirror = Collection::new(settings.record_id.clone());
        if let Some(content) = area.get_item(&storage_key)? {
            let stored: Vec<Value> = serde_json::from_str(&content)?;
            let records = stored
                .into_iter()
                .map(|value| crypto::decode(crypto.as_ref(), value))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(store = name, key = %storage_key, count = records.len(), "loaded persisted records");
            mirror.save(records, true);
        }

        Ok(Self {
            name: name.to_string(),
            record_id: settings.record_id.clone(),
            storage_type: settings.storage_type,
            storage_key,
            area,
            crypto,
            mirror: RwLock::new(mirror),
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage_type
    }

    /// Write the whole collection to the area. The write itself runs on the
    /// blocking pool since file-backed areas do synchronous I/O.
    async fn persist(&self, collection: &Collection) -> Result<(), StoreError> {
        let stored = collection
            .records()
            .iter()
            .map(|record| crypto::encode(self.crypto.as_ref(), record, &self.record_id))
            .collect::<Result<Vec<_>, _>>()?;
        let content = serde_json::to_string(&stored)?;

        let area = Arc::clone(&self.area);
        let key = self.storage_key.clone();
        tokio::task::spawn_blocking(move || area.set_item(&key, &content))
            .await
            .map_err(|e| StoreError::Backend(format!("task join: {e}")))?
    }

    /// Apply `mutate` to the mirror and persist it, restoring the previous
    /// mirror if persisting fails.
    async fn mutate_and_persist<F>(&self, mutate: F) -> Result<Vec<Record>, StoreError>
    where
        F: FnOnce(&mut Collection) + Send,
    {
        let mut mirror = self.mirror.write().await;
        let snapshot = mirror.clone();
        mutate(&mut mirror);

        if let Err(err) = self.persist(&mirror).await {
            warn!(
                store = %self.name,
                key = %self.storage_key,
                error = %err,
                "persisting collection failed, rolling back"
            );
            *mirror = snapshot;
            return Err(err);
        }
        Ok(mirror.records().to_vec())
    }
}

impl std::fmt::Debug for SessionLocalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLocalAdapter")
            .field("name", &self.name)
            .field("storage_type", &self.storage_type)
            .field("storage_key", &self.storage_key)
            .field("area", &self.area)
            .finish()
    }
}

#[async_trait]
impl Adapter for SessionLocalAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::SessionLocal
    }

    fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Usable when the default data directory can be created.
    fn is_valid() -> bool {
        std::fs::create_dir_all(default_data_dir().join(LOCAL_AREA_DIR)).is_ok()
    }

    async fn open(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {}

    async fn read(&self, id: Option<&Value>) -> Result<Vec<Record>, StoreError> {
        Ok(self.mirror.read().await.read(id))
    }

    #[instrument(skip(self, data), fields(store = %self.name, count = data.len(), reset = options.reset))]
    async fn save(&self, data: Batch, options: SaveOptions) -> Result<Vec<Record>, StoreError> {
        self.mutate_and_persist(move |mirror| {
            mirror.save(data, options.reset);
        })
        .await
    }

    #[instrument(skip(self, removal), fields(store = %self.name))]
    async fn remove(&self, removal: Removal) -> Result<Vec<Record>, StoreError> {
        self.mutate_and_persist(move |mirror| {
            mirror.remove(&removal);
        })
        .await
    }

    async fn filter(
        &self,
        spec: Option<&FilterSpec>,
        match_any: bool,
    ) -> Result<Vec<Record>, StoreError> {
        Ok(self.mirror.read().await.filter(spec, match_any))
    }
}
