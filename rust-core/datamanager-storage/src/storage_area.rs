// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// String key/value storage areas behind the SessionLocal adapter.
//
// An area maps a storage key to one serialized collection. Two areas ship:
// a process-wide in-memory area standing in for session storage, and a
// directory of files standing in for local storage. Either may carry a byte
// quota; a write that would exceed it fails with `QuotaExceeded` and leaves
// the area unchanged.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::error::StoreError;

/// A synchronous string key/value area.
pub trait StorageArea: Send + Sync + fmt::Debug {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

fn check_quota(key: &str, size: u64, quota: Option<u64>) -> Result<(), StoreError> {
    match quota {
        Some(quota) if size > quota => Err(StoreError::QuotaExceeded {
            key: key.to_string(),
            size,
            quota,
        }),
        _ => Ok(()),
    }
}

/// In-memory area. Size is the sum of key and value lengths in bytes.
#[derive(Debug, Default)]
pub struct MemoryArea {
    items: Mutex<HashMap<String, String>>,
    quota: Option<u64>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Backend("storage area lock poisoned".to_string()))
    }
}

impl StorageArea for MemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.items()?;
        let others: usize = items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(key, (others + key.len() + value.len()) as u64, self.quota)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items()?.remove(key);
        Ok(())
    }
}

static SESSION_AREA: OnceLock<Arc<MemoryArea>> = OnceLock::new();

/// The process-wide session area. Every session-backed store in the process
/// shares it, so two stores with the same storage key see the same data.
pub fn session_area() -> Arc<MemoryArea> {
    Arc::clone(SESSION_AREA.get_or_init(|| Arc::new(MemoryArea::new())))
}

/// File-backed area: one `<encoded key>.json` file per storage key.
pub struct FileArea {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileArea {
    /// Use `dir` as the area, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "opened file storage area");
        Ok(Self { dir, quota: None })
    }

    pub fn with_quota(mut self, quota: u64) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_file_name(key)))
    }

    fn used_bytes_except(&self, path: &Path) -> Result<u64, StoreError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path() == path {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

impl fmt::Debug for FileArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileArea")
            .field("dir", &self.dir)
            .field("quota", &self.quota)
            .finish()
    }
}

impl StorageArea for FileArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if self.quota.is_some() {
            let used = self.used_bytes_except(&path)?;
            check_quota(key, used + value.len() as u64, self.quota)?;
        }
        // Write-then-rename so a failed write never truncates the old value.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Map a storage key to a portable file name. ASCII alphanumerics, `-` and
/// `_` pass through; every other byte becomes `%XX`.
fn encode_file_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
