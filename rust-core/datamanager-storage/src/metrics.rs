// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for stores.
//
// Wraps any `Adapter` and transparently collects per-operation call counts,
// latency sums, error counts and the number of records handed back.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use datamanager_model::{Batch, FilterSpec, Record, Removal};

use crate::adapter::{Adapter, BackendKind, SaveOptions};
use crate::error::StoreError;

/// Accumulated statistics for one store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterStats {
    /// Number of `read` operations performed.
    pub read_count: u64,
    /// Number of `save` operations performed.
    pub save_count: u64,
    /// Number of `remove` operations performed.
    pub remove_count: u64,
    /// Number of `filter` operations performed.
    pub filter_count: u64,
    /// Operations that returned an error.
    pub error_count: u64,
    /// Cumulative latency of `read` and `filter`, in milliseconds.
    pub read_latency_sum_ms: f64,
    /// Cumulative latency of `save` and `remove`, in milliseconds.
    pub write_latency_sum_ms: f64,
    /// Records returned by successful `read` and `filter` calls.
    pub records_returned: u64,
}

#[derive(Clone, Copy)]
enum Op {
    Read,
    Save,
    Remove,
    Filter,
}

/// A store wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use datamanager_storage::{Adapter, MemoryAdapter, MetricsAdapter};
///
/// # tokio_test::block_on(async {
/// let metered = MetricsAdapter::new(Arc::new(MemoryAdapter::new("tasks", "id")));
/// metered.read(None).await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!(stats.read_count, 1);
/// # });
/// ```
pub struct MetricsAdapter {
    inner: Arc<dyn Adapter>,
    stats: Arc<RwLock<AdapterStats>>,
}

impl MetricsAdapter {
    pub fn new(inner: Arc<dyn Adapter>) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(AdapterStats::default())),
        }
    }

    /// Snapshot of the current statistics.
    pub async fn stats(&self) -> AdapterStats {
        self.stats.read().await.clone()
    }

    pub async fn reset_stats(&self) {
        *self.stats.write().await = AdapterStats::default();
    }

    pub fn inner(&self) -> &Arc<dyn Adapter> {
        &self.inner
    }

    async fn record(&self, op: Op, started: Instant, result: &Result<Vec<Record>, StoreError>) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut s = self.stats.write().await;
        match op {
            Op::Read => s.read_count += 1,
            Op::Save => s.save_count += 1,
            Op::Remove => s.remove_count += 1,
            Op::Filter => s.filter_count += 1,
        }
        match op {
            Op::Read | Op::Filter => {
                s.read_latency_sum_ms += elapsed_ms;
                if let Ok(records) = result {
                    s.records_returned += records.len() as u64;
                }
            }
            Op::Save | Op::Remove => s.write_latency_sum_ms += elapsed_ms,
        }
        if result.is_err() {
            s.error_count += 1;
        }
    }
}

#[async_trait]
impl Adapter for MetricsAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    fn record_id(&self) -> &str {
        self.inner.record_id()
    }

    fn is_valid() -> bool {
        true
    }

    async fn open(&self) -> Result<(), StoreError> {
        self.inner.open().await
    }

    async fn close(&self) {
        self.inner.close().await
    }

    async fn read(&self, id: Option<&Value>) -> Result<Vec<Record>, StoreError> {
        let start = Instant::now();
        let result = self.inner.read(id).await;
        self.record(Op::Read, start, &result).await;
        result
    }

    async fn save(&self, data: Batch, options: SaveOptions) -> Result<Vec<Record>, StoreError> {
        let start = Instant::now();
        let result = self.inner.save(data, options).await;
        self.record(Op::Save, start, &result).await;
        result
    }

    async fn remove(&self, removal: Removal) -> Result<Vec<Record>, StoreError> {
        let start = Instant::now();
        let result = self.inner.remove(removal).await;
        self.record(Op::Remove, start, &result).await;
        result
    }

    async fn filter(
        &self,
        spec: Option<&FilterSpec>,
        match_any: bool,
    ) -> Result<Vec<Record>, StoreError> {
        let start = Instant::now();
        let result = self.inner.filter(spec, match_any).await;
        self.record(Op::Filter, start, &result).await;
        result
    }
}
