//! Closure Engine
//!
//! Ancestor/descendant reachability over the term graph, restricted to a
//! caller-supplied relation filter, with an LRU cache of resolved closures.
//!
//! Traversal is breadth-first with a visited-set guard: ontologies are not
//! always strict DAGs, so cycles must terminate and count each node once.
//!
//! Cache entries are stamped with the graph version they were computed
//! against; a hit is valid only when the stamp equals the graph's current
//! version, otherwise the entry is recomputed and replaced. Entries for the
//! same (key, version) are deterministic and equal, so racing readers that
//! overwrite each other are harmless.
//!
//! Thread-safe via interior mutability using parking_lot::Mutex.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::graph::{RelationFilter, TermGraph, TraversalDirection};

/// Default bound on distinct cached query shapes.
const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Cache metrics for monitoring and test instrumentation.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    /// Number of cache hits (valid version stamp)
    pub hits: u64,
    /// Number of cache misses (absent or stale entry)
    pub misses: u64,
    /// Number of entries evicted by the LRU bound
    pub evictions: u64,
    /// Number of full BFS computations performed
    pub computations: u64,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache key: one closure query shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClosureKey {
    term: String,
    filter: RelationFilter,
    direction: TraversalDirection,
}

/// Cached closure plus the graph version it was computed against.
#[derive(Debug, Clone)]
struct ClosureEntry {
    version: u64,
    ids: Arc<HashSet<String>>,
}

/// Inner state for the closure cache (protected by Mutex).
struct CacheState {
    entries: LruCache<ClosureKey, ClosureEntry>,
    metrics: CacheMetrics,
}

/// Computes and caches ancestor/descendant closures over a `TermGraph`.
///
/// The engine owns only its cache; every query borrows the graph for the
/// duration of the call. Queries take `&self` and are safe to share across
/// threads once the graph is frozen for reads.
pub struct ClosureEngine {
    state: Mutex<CacheState>,
}

impl ClosureEngine {
    /// Create an engine with the default cache capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create an engine with a bounded cache entry count.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Get a snapshot of cache metrics.
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    /// Reset cache metrics.
    pub fn reset_metrics(&self) {
        self.state.lock().metrics = CacheMetrics::default();
    }

    /// Drop all cached closures.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// All terms reachable from `id` in the ancestor direction.
    ///
    /// The start term is not a member of its own closure unless a cycle
    /// leads back to it.
    pub fn ancestors(
        &self,
        graph: &TermGraph,
        id: &str,
        filter: &RelationFilter,
    ) -> Arc<HashSet<String>> {
        self.closure(graph, id, filter, TraversalDirection::Ancestors)
    }

    /// All terms reachable from `id` in the descendant direction.
    pub fn descendants(
        &self,
        graph: &TermGraph,
        id: &str,
        filter: &RelationFilter,
    ) -> Arc<HashSet<String>> {
        self.closure(graph, id, filter, TraversalDirection::Descendants)
    }

    /// Resolve a closure, consulting the cache first.
    pub fn closure(
        &self,
        graph: &TermGraph,
        id: &str,
        filter: &RelationFilter,
        direction: TraversalDirection,
    ) -> Arc<HashSet<String>> {
        let key = ClosureKey {
            term: id.to_string(),
            filter: filter.clone(),
            direction,
        };
        let version = graph.version();

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(entry) = state.entries.get(&key) {
                if entry.version == version {
                    state.metrics.hits += 1;
                    return Arc::clone(&entry.ids);
                }
                debug!(
                    term = %key.term,
                    cached_version = entry.version,
                    graph_version = version,
                    "stale closure entry, recomputing"
                );
            }
            state.metrics.misses += 1;
        }

        // Compute outside the lock; racing readers may recompute the same
        // entry, and last-writer-wins is safe for equal deterministic values.
        let ids = Arc::new(self.traverse(graph, id, filter, direction));

        let mut state = self.state.lock();
        state.metrics.computations += 1;
        if state.entries.len() == state.entries.cap().get() && !state.entries.contains(&key) {
            state.metrics.evictions += 1;
        }
        state.entries.put(
            key,
            ClosureEntry {
                version,
                ids: Arc::clone(&ids),
            },
        );
        ids
    }

    /// Whether `a` is a descendant of `b` under the filter.
    ///
    /// Consults a cached descendant closure of `b` when one is valid;
    /// otherwise runs a short-circuiting BFS from `a` toward ancestors and
    /// stops at the first sighting of `b`. The truncated traversal is not
    /// cached (it is not a complete closure).
    pub fn is_descendant_of(
        &self,
        graph: &TermGraph,
        a: &str,
        b: &str,
        filter: &RelationFilter,
    ) -> bool {
        let key = ClosureKey {
            term: b.to_string(),
            filter: filter.clone(),
            direction: TraversalDirection::Descendants,
        };
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if let Some(entry) = state.entries.get(&key) {
                if entry.version == graph.version() {
                    state.metrics.hits += 1;
                    return entry.ids.contains(a);
                }
            }
            state.metrics.misses += 1;
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(a.to_string());
        while let Some(current) = queue.pop_front() {
            for next in graph.neighbors(&current, filter, TraversalDirection::Ancestors) {
                if next == b {
                    return true;
                }
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Terms reachable in the ancestor direction from every id in `ids`.
    ///
    /// Computes per-id ancestor closures (cache-assisted) and intersects
    /// them. An empty input yields an empty set.
    pub fn common_ancestors<'a, I>(
        &self,
        graph: &TermGraph,
        ids: I,
        filter: &RelationFilter,
    ) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut result: Option<HashSet<String>> = None;
        for id in ids {
            let closure = self.ancestors(graph, id, filter);
            result = Some(match result {
                None => (*closure).clone(),
                Some(acc) => acc.intersection(&closure).cloned().collect(),
            });
            if matches!(&result, Some(set) if set.is_empty()) {
                break;
            }
        }
        result.unwrap_or_default()
    }

    /// Breadth-first reachability with a visited-set cycle guard.
    fn traverse(
        &self,
        graph: &TermGraph,
        id: &str,
        filter: &RelationFilter,
        direction: TraversalDirection,
    ) -> HashSet<String> {
        let mut reached: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(id.to_string());
        while let Some(current) = queue.pop_front() {
            for next in graph.neighbors(&current, filter, direction) {
                if reached.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        reached
    }
}

impl Default for ClosureEngine {
    fn default() -> Self {
        Self::new()
    }
}
