// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Store configuration.
//!
//! A store is described by a [`StoreConfig`]: a name, a requested backend
//! kind and per-store [`StoreSettings`]. Callers may hand the registry a bare
//! name, one config, or a mixed list; [`StoreInput::normalize`] turns any of
//! these into a list of configs. Field names follow the historical camelCase
//! spelling (`recordId`, `storageType`, ...) so existing JSON configs
//! deserialize unchanged.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use datamanager_model::DEFAULT_RECORD_ID;

use crate::crypto::CryptoSettings;

/// Backend kind used when a config names none.
pub const DEFAULT_KIND: &str = "Memory";

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "DATAMANAGER_DATA_DIR";

/// Which key/value area a SessionLocal store persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageType {
    /// Process-lifetime area shared by every store in the process.
    #[default]
    #[serde(rename = "sessionStorage", alias = "session")]
    Session,
    /// Durable area, one file per storage key under the data directory.
    #[serde(rename = "localStorage", alias = "local")]
    Local,
}

/// Per-store settings. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Field used as the record key.
    pub record_id: String,
    /// Whether an unavailable kind may be replaced by a preferred one.
    pub fallback: bool,
    /// Fallback order; `None` uses [`crate::selector::DEFAULT_PREFERRED`].
    pub preferred: Option<Vec<String>>,
    /// SessionLocal only: which area to persist to.
    pub storage_type: StorageType,
    /// IndexedDB/WebSQL only: open on first use instead of requiring
    /// an explicit `open()`.
    pub auto: bool,
    /// SessionLocal only: application context appended to the storage key.
    pub app_context: Option<String>,
    /// Directory for file-backed stores. See [`StoreSettings::resolved_data_dir`].
    pub data_dir: Option<PathBuf>,
    /// Set by the selector when an IndexedDB/WebSQL request fell back to a
    /// synchronous kind. Informational only.
    #[serde(rename = "async")]
    pub legacy_async: bool,
    /// Encryption hook applied to persisted records.
    #[serde(skip)]
    pub crypto: Option<CryptoSettings>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            record_id: DEFAULT_RECORD_ID.to_string(),
            fallback: true,
            preferred: None,
            storage_type: StorageType::Session,
            auto: false,
            app_context: None,
            data_dir: None,
            legacy_async: false,
            crypto: None,
        }
    }
}

impl StoreSettings {
    /// Directory used by file-backed stores: the explicit `data_dir`, else
    /// [`default_data_dir`].
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// `$DATAMANAGER_DATA_DIR` if set and non-empty, else `<tmp>/datamanager`.
pub fn default_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir().join("datamanager"),
    }
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

/// One store to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store name. Configs with an empty name are skipped.
    #[serde(default)]
    pub name: String,
    /// Requested backend kind, e.g. `"IndexedDB"`.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub settings: StoreSettings,
}

impl StoreConfig {
    /// A Memory store with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_kind(),
            settings: StoreSettings::default(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// One element of a config list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoreEntry {
    Name(String),
    Config(StoreConfig),
}

impl From<StoreEntry> for StoreConfig {
    fn from(entry: StoreEntry) -> Self {
        match entry {
            StoreEntry::Name(name) => StoreConfig::new(name),
            StoreEntry::Config(config) => config,
        }
    }
}

/// Anything the registry accepts as a store description.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoreInput {
    Name(String),
    List(Vec<StoreEntry>),
    Config(StoreConfig),
}

impl StoreInput {
    /// Expand into configs, in input order, skipping nameless entries.
    pub fn normalize(self) -> Vec<StoreConfig> {
        let configs = match self {
            StoreInput::Name(name) => vec![StoreConfig::new(name)],
            StoreInput::Config(config) => vec![config],
            StoreInput::List(entries) => entries.into_iter().map(StoreConfig::from).collect(),
        };
        configs.into_iter().filter(|c| !c.name.is_empty()).collect()
    }
}

impl From<&str> for StoreInput {
    fn from(name: &str) -> Self {
        StoreInput::Name(name.to_string())
    }
}

impl From<String> for StoreInput {
    fn from(name: String) -> Self {
        StoreInput::Name(name)
    }
}

impl From<StoreConfig> for StoreInput {
    fn from(config: StoreConfig) -> Self {
        StoreInput::Config(config)
    }
}

impl From<Vec<StoreConfig>> for StoreInput {
    fn from(configs: Vec<StoreConfig>) -> Self {
        StoreInput::List(configs.into_iter().map(StoreEntry::Config).collect())
    }
}

impl From<Vec<&str>> for StoreInput {
    fn from(names: Vec<&str>) -> Self {
        StoreInput::List(
            names
                .into_iter()
                .map(|n| StoreEntry::Name(n.to_string()))
                .collect(),
        )
    }
}

impl From<Vec<StoreEntry>> for StoreInput {
    fn from(entries: Vec<StoreEntry>) -> Self {
        StoreInput::List(entries)
    }
}
