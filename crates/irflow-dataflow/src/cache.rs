use crate::barrier_guard::FunctionAnalyses;
use crate::local_flow::StepIndex;
use crate::node::Node;
use irflow_core::FunctionId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// An append-only memo table. Entries are computed once and never evicted or
/// invalidated, so concurrent readers always observe the first stored value.
pub struct MemoTable<K, V> {
    entries: RwLock<HashMap<K, Arc<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> MemoTable<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get_or_compute<F>(&self, key: K, compute: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(compute());

        // Another thread may have raced us; keep whichever landed first.
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert(value).clone()
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl<K, V> Default for MemoTable<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStatistics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl std::ops::Add for CacheStatistics {
    type Output = CacheStatistics;

    fn add(self, other: CacheStatistics) -> CacheStatistics {
        CacheStatistics {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            entries: self.entries + other.entries,
        }
    }
}

/// Per-graph memoization of everything derived from the immutable program.
#[derive(Default)]
pub struct FlowCache {
    pub(crate) step_indexes: MemoTable<FunctionId, StepIndex>,
    pub(crate) closures: MemoTable<(FunctionId, Node), HashSet<Node>>,
    pub(crate) analyses: MemoTable<FunctionId, FunctionAnalyses>,
}

impl FlowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.step_indexes.statistics() + self.closures.statistics() + self.analyses.statistics()
    }

    pub fn closure_statistics(&self) -> CacheStatistics {
        self.closures.statistics()
    }
}
