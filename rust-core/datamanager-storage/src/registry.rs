// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store registry.
//
// Maps store names to live adapters. The capability table is computed once
// when the registry is created and never re-probed. Adding a store with an
// existing name replaces the previous one.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::adapter::{Adapter, BackendKind};
use crate::config::{StoreConfig, StoreInput};
use crate::error::StoreError;
use crate::memory::MemoryAdapter;
use crate::selector::{select, Capabilities};
use crate::session_local::SessionLocalAdapter;

struct Registered {
    adapter: Arc<dyn Adapter>,
    config: StoreConfig,
}

/// A set of named stores.
///
/// # Example
///
/// ```rust
/// use datamanager_storage::{BackendKind, Capabilities, Registry, StoreConfig};
///
/// let registry = Registry::with_capabilities(Capabilities::from_kinds([BackendKind::Memory]));
/// registry
///     .add("tasks")
///     .unwrap()
///     .add(StoreConfig::new("cache").with_kind("IndexedDB"))
///     .unwrap();
///
/// // IndexedDB is unavailable here, so "cache" fell back to Memory.
/// assert_eq!(registry.store("cache").unwrap().kind(), BackendKind::Memory);
/// assert_eq!(registry.names(), vec!["cache", "tasks"]);
/// ```
pub struct Registry {
    capabilities: Capabilities,
    stores: RwLock<BTreeMap<String, Registered>>,
}

impl Registry {
    /// A registry over the probed capabilities of this environment.
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::probe())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            stores: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Create stores for `input` and register them.
    ///
    /// Every config is resolved and constructed before any is registered, so
    /// a configuration error leaves the registry unchanged.
    pub fn add(&self, input: impl Into<StoreInput>) -> Result<&Self, StoreError> {
        let built = input
            .into()
            .normalize()
            .into_iter()
            .map(|config| self.build(config))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        for entry in built {
            debug!(store = %entry.config.name, kind = %entry.config.kind, "registered store");
            stores.insert(entry.config.name.clone(), entry);
        }
        Ok(self)
    }

    /// Unregister the stores named by `input`. Unknown names are ignored.
    /// Adapters already handed out stay usable.
    pub fn remove(&self, input: impl Into<StoreInput>) -> &Self {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        for config in input.into().normalize() {
            if stores.remove(&config.name).is_some() {
                debug!(store = %config.name, "removed store");
            }
        }
        self
    }

    pub fn store(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entry| Arc::clone(&entry.adapter))
    }

    /// The resolved config a store was built from: `kind` is the selected
    /// kind and `settings.legacy_async` reflects the fallback.
    pub fn config(&self, name: &str) -> Option<StoreConfig> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entry| entry.config.clone())
    }

    /// Registered store names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stores.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(&self, mut config: StoreConfig) -> Result<Registered, StoreError> {
        if config.settings.record_id.is_empty() {
            return Err(StoreError::InvalidConfig(format!(
                "store '{}': recordId must not be empty",
                config.name
            )));
        }

        let selection = select(&config.kind, &config.settings, &self.capabilities);
        config.kind = selection.kind;
        config.settings.legacy_async |= selection.legacy_async;

        let kind: BackendKind = config.kind.parse()?;
        if !self.capabilities.contains_kind(kind) {
            return Err(StoreError::UnsupportedBackend(config.kind));
        }

        let adapter: Arc<dyn Adapter> = match kind {
            BackendKind::Memory => Arc::new(MemoryAdapter::from_settings(&config.name, &config.settings)),
            BackendKind::SessionLocal => {
                Arc::new(SessionLocalAdapter::new(&config.name, &config.settings)?)
            }
            #[cfg(feature = "redb-backend")]
            BackendKind::IndexedDb => Arc::new(crate::redb_backend::IndexedDbAdapter::new(
                &config.name,
                &config.settings,
            )),
            #[cfg(feature = "sqlite-backend")]
            BackendKind::WebSql => Arc::new(crate::sqlite_backend::WebSqlAdapter::new(
                &config.name,
                &config.settings,
            )),
            #[allow(unreachable_patterns)]
            other => return Err(StoreError::UnsupportedBackend(other.to_string())),
        };

        Ok(Registered { adapter, config })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("capabilities", &self.capabilities)
            .field("stores", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Process-wide registry, probed on first access.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}
