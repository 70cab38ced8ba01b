// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IndexedDB store adapter, backed by redb.
//
// Each store is one object store: a redb table named after the store inside
// `<data_dir>/<name>.redb`. Keys are the canonical key text of each record,
// values the JSON payload (or crypto envelope).
//
// # Design
//
// - The database is opened explicitly with `open()`, or on first use when
//   the store is configured with `auto`.
// - `save` is one write transaction: clear the table on reset, then upsert
//   every record.
// - `read(id)` is a direct key lookup; `read()` and `filter` materialise
//   every row in key order and run the matcher in memory.
// - All redb work runs on the blocking pool via `spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition,
    TableError,
};
use serde_json::Value;
use tracing::{debug, instrument};

use datamanager_model::{Batch, Collection, FilterSpec, Record, Removal};

use crate::adapter::{Adapter, BackendKind, SaveOptions};
use crate::config::{default_data_dir, StoreSettings};
use crate::connection::{key_text, Connection};
use crate::crypto::{self, CryptoSettings};
use crate::error::StoreError;

/// Object-store table for a store. Keys are canonical key text, values JSON.
fn table_def(name: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Backend(format!("task join: {e}"))
}

/// Open or create the database file and make sure the store's table exists.
async fn create_database(path: PathBuf, table: String) -> Result<Database, StoreError> {
    tokio::task::spawn_blocking(move || -> Result<Database, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| {
            StoreError::Backend(format!("failed to open redb at {}: {e}", path.display()))
        })?;

        let txn = db
            .begin_write()
            .map_err(|e| StoreError::Backend(format!("write txn: {e}")))?;
        txn.open_table(table_def(&table))
            .map_err(|e| StoreError::Backend(format!("create table: {e}")))?;
        txn.commit()
            .map_err(|e| StoreError::Backend(format!("commit: {e}")))?;

        debug!(path = %path.display(), table = %table, "opened redb object store");
        Ok(db)
    })
    .await
    .map_err(join_error)?
}

/// Open the store's table for reading. A table that was never created reads
/// as empty; any other failure is a backend error.
fn open_read_table(
    txn: &ReadTransaction,
    name: &str,
) -> Result<Option<ReadOnlyTable<&'static [u8], &'static [u8]>>, StoreError> {
    match txn.open_table(table_def(name)) {
        Ok(table) => Ok(Some(table)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(StoreError::Backend(format!("open table: {e}"))),
    }
}

/// A store persisted as a redb object store.
pub struct IndexedDbAdapter {
    name: String,
    record_id: String,
    path: PathBuf,
    crypto: Option<CryptoSettings>,
    connection: Connection<Database>,
}

impl IndexedDbAdapter {
    /// Store at `<data_dir>/<name>.redb`.
    pub fn new(name: &str, settings: &StoreSettings) -> Self {
        let path = settings.resolved_data_dir().join(format!("{name}.redb"));
        Self::with_path(name, settings, path)
    }

    pub fn with_path(name: &str, settings: &StoreSettings, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            record_id: settings.record_id.clone(),
            path: path.into(),
            crypto: settings.crypto.clone(),
            connection: Connection::new(name, settings.auto),
        }
    }

    /// Filesystem path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_open(&self) -> bool {
        self.connection.is_open().await
    }

    async fn database(&self) -> Result<Arc<Database>, StoreError> {
        let (path, table) = (self.path.clone(), self.name.clone());
        self.connection
            .handle(move || create_database(path, table))
            .await
    }

    fn encode_rows(&self, records: &[Record]) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        records
            .iter()
            .map(|record| {
                let stored = crypto::encode(self.crypto.as_ref(), record, &self.record_id)?;
                Ok((
                    key_text(record.key(&self.record_id)),
                    serde_json::to_vec(&stored)?,
                ))
            })
            .collect()
    }

    fn decode_rows(&self, rows: Vec<Vec<u8>>) -> Result<Vec<Record>, StoreError> {
        rows.into_iter()
            .map(|bytes| {
                let stored: Value = serde_json::from_slice(&bytes)?;
                crypto::decode(self.crypto.as_ref(), stored)
            })
            .collect()
    }

    /// Every row of the store's table, in key order.
    async fn load_all(&self, db: Arc<Database>) -> Result<Vec<Record>, StoreError> {
        let table = self.name.clone();

        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<u8>>, StoreError> {
            let txn = db
                .begin_read()
                .map_err(|e| StoreError::Backend(format!("read txn: {e}")))?;
            let table = match open_read_table(&txn, &table)? {
                Some(t) => t,
                None => return Ok(Vec::new()),
            };

            let mut rows = Vec::new();
            let iter = table
                .iter()
                .map_err(|e| StoreError::Backend(format!("scan: {e}")))?;
            for entry in iter {
                let entry = entry.map_err(|e| StoreError::Backend(format!("scan entry: {e}")))?;
                rows.push(entry.1.value().to_vec());
            }
            Ok(rows)
        })
        .await
        .map_err(join_error)??;

        self.decode_rows(rows)
    }

    async fn load_one(&self, db: Arc<Database>, key: String) -> Result<Vec<Record>, StoreError> {
        let table = self.name.clone();

        let row = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, StoreError> {
            let txn = db
                .begin_read()
                .map_err(|e| StoreError::Backend(format!("read txn: {e}")))?;
            let table = match open_read_table(&txn, &table)? {
                Some(t) => t,
                None => return Ok(None),
            };
            match table.get(key.as_bytes()) {
                Ok(Some(value)) => Ok(Some(value.value().to_vec())),
                Ok(None) => Ok(None),
                Err(e) => Err(StoreError::Backend(format!("get: {e}"))),
            }
        })
        .await
        .map_err(join_error)??;

        self.decode_rows(row.into_iter().collect())
    }
}

impl std::fmt::Debug for IndexedDbAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedDbAdapter")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl Adapter for IndexedDbAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::IndexedDb
    }

    fn record_id(&self) -> &str {
        &self.record_id
    }

    fn is_valid() -> bool {
        std::fs::create_dir_all(default_data_dir()).is_ok()
    }

    #[instrument(skip_all, fields(store = %self.name))]
    async fn open(&self) -> Result<(), StoreError> {
        let (path, table) = (self.path.clone(), self.name.clone());
        self.connection
            .open_with(move || create_database(path, table))
            .await
            .map(|_| ())
    }

    async fn close(&self) {
        self.connection.close().await;
    }

    async fn read(&self, id: Option<&Value>) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        match id {
            Some(id) => self.load_one(db, key_text(Some(id))).await,
            None => self.load_all(db).await,
        }
    }

    #[instrument(skip(self, data), fields(store = %self.name, count = data.len(), reset = options.reset))]
    async fn save(&self, data: Batch, options: SaveOptions) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        let rows = self.encode_rows(data.records())?;
        let writer = Arc::clone(&db);
        let table = self.name.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let txn = writer
                .begin_write()
                .map_err(|e| StoreError::Backend(format!("write txn: {e}")))?;
            {
                if options.reset {
                    txn.delete_table(table_def(&table))
                        .map_err(|e| StoreError::Backend(format!("clear table: {e}")))?;
                }
                let mut t = txn
                    .open_table(table_def(&table))
                    .map_err(|e| StoreError::Backend(format!("open table: {e}")))?;
                for (key, payload) in &rows {
                    t.insert(key.as_bytes(), payload.as_slice())
                        .map_err(|e| StoreError::Backend(format!("insert: {e}")))?;
                }
            }
            txn.commit()
                .map_err(|e| StoreError::Backend(format!("commit: {e}")))?;
            Ok(())
        })
        .await
        .map_err(join_error)??;

        self.load_all(db).await
    }

    #[instrument(skip(self, removal), fields(store = %self.name))]
    async fn remove(&self, removal: Removal) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        let keys: Option<Vec<String>> = removal
            .resolved_keys(&self.record_id)
            .map(|keys| keys.into_iter().map(|k| key_text(Some(k))).collect());
        let writer = Arc::clone(&db);
        let table = self.name.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let txn = writer
                .begin_write()
                .map_err(|e| StoreError::Backend(format!("write txn: {e}")))?;
            match keys {
                None => {
                    txn.delete_table(table_def(&table))
                        .map_err(|e| StoreError::Backend(format!("clear table: {e}")))?;
                    txn.open_table(table_def(&table))
                        .map_err(|e| StoreError::Backend(format!("open table: {e}")))?;
                }
                Some(keys) => {
                    let mut t = txn
                        .open_table(table_def(&table))
                        .map_err(|e| StoreError::Backend(format!("open table: {e}")))?;
                    for key in &keys {
                        t.remove(key.as_bytes())
                            .map_err(|e| StoreError::Backend(format!("remove: {e}")))?;
                    }
                }
            }
            txn.commit()
                .map_err(|e| StoreError::Backend(format!("commit: {e}")))?;
            Ok(())
        })
        .await
        .map_err(join_error)??;

        self.load_all(db).await
    }

    async fn filter(
        &self,
        spec: Option<&FilterSpec>,
        match_any: bool,
    ) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        let records = self.load_all(db).await?;
        Ok(Collection::with_records(self.record_id.clone(), records).filter(spec, match_any))
    }
}
