// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store error types for the DataManager adapters.
//
// Configuration errors (unknown or unsupported backend kinds) are returned
// synchronously when a store is added to the registry. Everything else is an
// operational error returned from an adapter's async operations. Native
// database failures keep their original message in `Backend`.

use thiserror::Error;

use datamanager_model::ModelError;

/// Errors that can occur when configuring or operating a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested backend kind is not one this crate knows.
    #[error("unknown backend kind: {0}")]
    UnknownBackend(String),

    /// The backend kind exists but its capability probe failed in this
    /// environment and no fallback applied.
    #[error("backend kind not supported in this environment: {0}")]
    UnsupportedBackend(String),

    /// An operation ran before `open()` on a store without auto-connect.
    #[error("store '{0}' is not open")]
    NotOpen(String),

    /// A key/value storage area refused a write.
    #[error("storage quota exceeded for '{key}': {size} bytes (quota: {quota})")]
    QuotaExceeded {
        /// Storage key that was being written.
        key: String,
        /// Size of the area after the rejected write, in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        quota: u64,
    },

    /// An I/O error occurred in a file-backed storage area.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize stored records.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The encryption hook failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The underlying database reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// A store configuration could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stored or supplied data did not fit the record model.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl StoreError {
    /// True for errors raised at configuration time rather than by an
    /// operation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownBackend(_)
                | StoreError::UnsupportedBackend(_)
                | StoreError::InvalidConfig(_)
        )
    }
}
