// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// WebSQL store adapter, backed by an embedded SQLite database.
//
// Each store is one table `(id TEXT PRIMARY KEY, json TEXT)` in
// `<data_dir>/<name>.sqlite`. `id` holds the canonical key text and `json`
// the serialized record (or crypto envelope). Rows come back in rowid order,
// so an upsert moves the record to the end of the collection.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection as SqlConnection};
use serde_json::Value;
use tracing::{debug, instrument};

use datamanager_model::{Batch, Collection, FilterSpec, Record, Removal};

use crate::adapter::{Adapter, BackendKind, SaveOptions};
use crate::config::{default_data_dir, StoreSettings};
use crate::connection::{key_text, Connection};
use crate::crypto::{self, CryptoSettings};
use crate::error::StoreError;

type SharedConnection = Mutex<SqlConnection>;

fn sql_error(context: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| StoreError::Backend(format!("{context}: {e}"))
}

fn join_error(e: tokio::task::JoinError) -> StoreError {
    StoreError::Backend(format!("task join: {e}"))
}

fn lock(conn: &SharedConnection) -> Result<std::sync::MutexGuard<'_, SqlConnection>, StoreError> {
    conn.lock()
        .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))
}

/// Double-quoted SQL identifier for a store name.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, json TEXT NOT NULL)")
}

async fn create_database(path: PathBuf, table: String) -> Result<SharedConnection, StoreError> {
    tokio::task::spawn_blocking(move || -> Result<SharedConnection, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = SqlConnection::open(&path).map_err(|e| {
            StoreError::Backend(format!("failed to open sqlite at {}: {e}", path.display()))
        })?;
        conn.execute(&create_table_sql(&table), params![])
            .map_err(sql_error("create table"))?;
        debug!(path = %path.display(), table = %table, "opened sqlite table");
        Ok(Mutex::new(conn))
    })
    .await
    .map_err(join_error)?
}

fn select_rows(conn: &SqlConnection, table: &str, key: Option<&str>) -> Result<Vec<String>, StoreError> {
    let mut rows = Vec::new();
    match key {
        Some(key) => {
            let mut stmt = conn
                .prepare(&format!("SELECT json FROM {table} WHERE id = ?1"))
                .map_err(sql_error("prepare select"))?;
            let iter = stmt
                .query_map(params![key], |row| row.get::<_, String>(0))
                .map_err(sql_error("select"))?;
            for row in iter {
                rows.push(row.map_err(sql_error("select row"))?);
            }
        }
        None => {
            let mut stmt = conn
                .prepare(&format!("SELECT json FROM {table} ORDER BY rowid"))
                .map_err(sql_error("prepare select"))?;
            let iter = stmt
                .query_map(params![], |row| row.get::<_, String>(0))
                .map_err(sql_error("select"))?;
            for row in iter {
                rows.push(row.map_err(sql_error("select row"))?);
            }
        }
    }
    Ok(rows)
}

/// A store persisted as a SQLite table.
pub struct WebSqlAdapter {
    name: String,
    table: String,
    record_id: String,
    path: PathBuf,
    crypto: Option<CryptoSettings>,
    connection: Connection<SharedConnection>,
}

impl WebSqlAdapter {
    /// Store at `<data_dir>/<name>.sqlite`.
    pub fn new(name: &str, settings: &StoreSettings) -> Self {
        let path = settings.resolved_data_dir().join(format!("{name}.sqlite"));
        Self::with_path(name, settings, path)
    }

    pub fn with_path(name: &str, settings: &StoreSettings, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            table: quote_ident(name),
            record_id: settings.record_id.clone(),
            path: path.into(),
            crypto: settings.crypto.clone(),
            connection: Connection::new(name, settings.auto),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_open(&self) -> bool {
        self.connection.is_open().await
    }

    async fn database(&self) -> Result<Arc<SharedConnection>, StoreError> {
        let (path, table) = (self.path.clone(), self.table.clone());
        self.connection
            .handle(move || create_database(path, table))
            .await
    }

    fn decode_rows(&self, rows: Vec<String>) -> Result<Vec<Record>, StoreError> {
        rows.into_iter()
            .map(|text| {
                let stored: Value = serde_json::from_str(&text)?;
                crypto::decode(self.crypto.as_ref(), stored)
            })
            .collect()
    }

    async fn select(
        &self,
        db: Arc<SharedConnection>,
        key: Option<String>,
    ) -> Result<Vec<Record>, StoreError> {
        let table = self.table.clone();
        let rows = tokio::task::spawn_blocking(move || {
            let conn = lock(&db)?;
            select_rows(&conn, &table, key.as_deref())
        })
        .await
        .map_err(join_error)??;
        self.decode_rows(rows)
    }
}

impl std::fmt::Debug for WebSqlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSqlAdapter")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl Adapter for WebSqlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::WebSql
    }

    fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Usable when an in-memory SQLite database can be opened and the data
    /// directory can be created.
    fn is_valid() -> bool {
        SqlConnection::open_in_memory().is_ok() && std::fs::create_dir_all(default_data_dir()).is_ok()
    }

    #[instrument(skip_all, fields(store = %self.name))]
    async fn open(&self) -> Result<(), StoreError> {
        let (path, table) = (self.path.clone(), self.table.clone());
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
        self.select(db, id.map(|id| key_text(Some(id)))).await
    }

    #[instrument(skip(self, data), fields(store = %self.name, count = data.len(), reset = options.reset))]
    async fn save(&self, data: Batch, options: SaveOptions) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        let rows = data
            .records()
            .iter()
            .map(|record| {
                let stored = crypto::encode(self.crypto.as_ref(), record, &self.record_id)?;
                Ok((key_text(record.key(&self.record_id)), serde_json::to_string(&stored)?))
            })
            .collect::<Result<Vec<(String, String)>, StoreError>>()?;
        let writer = Arc::clone(&db);
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = lock(&writer)?;
            let tx = conn.transaction().map_err(sql_error("begin"))?;
            if options.reset {
                tx.execute(&format!("DROP TABLE IF EXISTS {table}"), params![])
                    .map_err(sql_error("drop table"))?;
                tx.execute(&create_table_sql(&table), params![])
                    .map_err(sql_error("create table"))?;
            }
            {
                let mut stmt = tx
                    .prepare(&format!("INSERT OR REPLACE INTO {table} (id, json) VALUES (?1, ?2)"))
                    .map_err(sql_error("prepare insert"))?;
                for (key, json) in &rows {
                    stmt.execute(params![key, json])
                        .map_err(sql_error("insert"))?;
                }
            }
            tx.commit().map_err(sql_error("commit"))?;
            Ok(())
        })
        .await
        .map_err(join_error)??;

        self.select(db, None).await
    }

    #[instrument(skip(self, removal), fields(store = %self.name))]
    async fn remove(&self, removal: Removal) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        let keys: Option<Vec<String>> = removal
            .resolved_keys(&self.record_id)
            .map(|keys| keys.into_iter().map(|k| key_text(Some(k))).collect());
        let writer = Arc::clone(&db);
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut conn = lock(&writer)?;
            let tx = conn.transaction().map_err(sql_error("begin"))?;
            match keys {
                None => {
                    tx.execute(&format!("DELETE FROM {table}"), params![])
                        .map_err(sql_error("delete all"))?;
                }
                Some(keys) => {
                    let mut stmt = tx
                        .prepare(&format!("DELETE FROM {table} WHERE id = ?1"))
                        .map_err(sql_error("prepare delete"))?;
                    for key in &keys {
                        stmt.execute(params![key]).map_err(sql_error("delete"))?;
                    }
                }
            }
            tx.commit().map_err(sql_error("commit"))?;
            Ok(())
        })
        .await
        .map_err(join_error)??;

        self.select(db, None).await
    }

    async fn filter(
        &self,
        spec: Option<&FilterSpec>,
        match_any: bool,
    ) -> Result<Vec<Record>, StoreError> {
        let db = self.database().await?;
        let records = self.select(db, None).await?;
        Ok(Collection::with_records(self.record_id.clone(), records).filter(spec, match_any))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_cipher::reversing;
    use serde_json::json;
    use tempfile::tempdir;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    fn settings(dir: &Path, auto: bool) -> StoreSettings {
        StoreSettings {
            auto,
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("tasks"), "\"tasks\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_basic_crud() {
        let dir = tempdir().unwrap();
        let store = WebSqlAdapter::new("tasks", &settings(dir.path(), false));
        store.open().await.unwrap();

        store
            .save(
                vec![rec(json!({"id": 1, "title": "a"})), rec(json!({"id": 2, "title": "b"}))].into(),
                SaveOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(store.read(None).await.unwrap().len(), 2);
        assert_eq!(
            store.read(Some(&json!(1))).await.unwrap(),
            vec![rec(json!({"id": 1, "title": "a"}))]
        );

        let left = store.remove(Removal::key(1)).await.unwrap();
        assert_eq!(left, vec![rec(json!({"id": 2, "title": "b"}))]);

        let left = store.remove(Removal::All).await.unwrap();
        assert!(left.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_reset() {
        let dir = tempdir().unwrap();
        let store = WebSqlAdapter::new("tasks", &settings(dir.path(), true));

        store
            .save(
                vec![rec(json!({"id": 1})), rec(json!({"id": 2}))].into(),
                SaveOptions::default(),
            )
            .await
            .unwrap();
        let all = store
            .save(rec(json!({"id": 1, "done": true})).into(), SaveOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&rec(json!({"id": 1, "done": true}))));

        let all = store
            .save(rec(json!({"id": 3})).into(), SaveOptions::reset())
            .await
            .unwrap();
        assert_eq!(all, vec![rec(json!({"id": 3}))]);
    }

    #[tokio::test]
    async fn test_not_open_without_auto() {
        let dir = tempdir().unwrap();
        let store = WebSqlAdapter::new("tasks", &settings(dir.path(), false));
        assert!(matches!(
            store.save(rec(json!({"id": 1})).into(), SaveOptions::default()).await,
            Err(StoreError::NotOpen(_))
        ));
    }

    #[tokio::test]
    async fn test_filter_and_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = WebSqlAdapter::new("tasks", &settings(dir.path(), true));
            store
                .save(
                    vec![
                        rec(json!({"id": 1, "tags": ["rust", "db"]})),
                        rec(json!({"id": 2, "tags": ["go"]})),
                    ]
                    .into(),
                    SaveOptions::default(),
                )
                .await
                .unwrap();
            store.close().await;
        }

        let store = WebSqlAdapter::new("tasks", &settings(dir.path(), true));
        let spec = FilterSpec::new().with("tags", datamanager_model::Criterion::any_of(["db"]));
        let found = store.filter(Some(&spec), false).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key("id"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_encrypted_rows() {
        let dir = tempdir().unwrap();
        let settings = StoreSettings {
            crypto: Some(reversing()),
            ..settings(dir.path(), true)
        };
        let store = WebSqlAdapter::new("secrets", &settings);
        store
            .save(
                vec![rec(json!({"id": 1, "pin": "1234"})), rec(json!({"id": 2, "pin": "0000"}))].into(),
                SaveOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            store.read(Some(&json!(1))).await.unwrap(),
            vec![rec(json!({"id": 1, "pin": "1234"}))]
        );
        let spec = FilterSpec::new().with("pin", "0000");
        assert_eq!(
            store.filter(Some(&spec), false).await.unwrap(),
            vec![rec(json!({"id": 2, "pin": "0000"}))]
        );
        store.close().await;

        // Only the key stays readable in the stored envelope.
        let conn = SqlConnection::open(store.path()).unwrap();
        let raw: String = conn
            .query_row("SELECT json FROM \"secrets\" WHERE id = '1'", [], |row| row.get(0))
            .unwrap();
        let envelope: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope["id"], json!(1));
        assert!(!raw.contains("\"pin\""));
    }
}
