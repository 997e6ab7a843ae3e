//! State graph source and cached path resolution
//!
//! Path definitions live in the persistence layer and are immutable once
//! published, so the resolver caches them with no active invalidation: a
//! bounded map where concurrent misses on the same key share one fetch.
//! Each resolver owns its source; dropping the resolver drops every cached
//! path with it, so cached data never outlives the owning store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use super::error::WorkflowError;
use super::graph::StatePath;
use crate::persistence::StoreError;

/// Loads a path plus both endpoint states and their groups/graphs in one
/// fetch. Eager-loading strategy is the implementation's concern.
#[async_trait]
pub trait StateGraphSource: Send + Sync {
    async fn load_path(&self, code_name: &str) -> Result<Option<Arc<StatePath>>, StoreError>;
}

/// Default bound for the resolver cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cached, single-flight path resolution keyed by code name.
pub struct PathResolver {
    source: Arc<dyn StateGraphSource>,
    capacity: usize,
    cache: DashMap<String, Arc<OnceCell<Arc<StatePath>>>>,
}

impl PathResolver {
    pub fn new(source: Arc<dyn StateGraphSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(source: Arc<dyn StateGraphSource>, capacity: usize) -> Self {
        Self {
            source,
            capacity: capacity.max(1),
            cache: DashMap::new(),
        }
    }

    /// Resolve a path by code name.
    ///
    /// Concurrent resolutions of the same missing key share a single source
    /// fetch. Fails with [`WorkflowError::NotFound`] if no path has that
    /// code name; a failed fetch is not cached, so the next call retries.
    pub async fn resolve(&self, code_name: &str) -> Result<Arc<StatePath>, WorkflowError> {
        if !self.cache.contains_key(code_name) && self.cache.len() >= self.capacity {
            // Paths are immutable, so evicting an arbitrary resident entry
            // only costs a refetch on its next miss.
            let victim = self.cache.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.cache.remove(&victim);
                debug!(code_name = %victim, "path cache entry evicted");
            }
        }

        let cell = self
            .cache
            .entry(code_name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let path = cell
            .get_or_try_init(|| async {
                debug!(code_name, "path cache miss");
                self.source
                    .load_path(code_name)
                    .await?
                    .ok_or_else(|| WorkflowError::NotFound(code_name.to_string()))
            })
            .await?;

        Ok(path.clone())
    }

    /// Number of resident cache entries.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// In-memory graph source for tests and demos.
#[cfg(feature = "memory-store")]
pub mod memory {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct MemoryGraphSource {
        paths: DashMap<String, Arc<StatePath>>,
        fetches: AtomicUsize,
    }

    impl MemoryGraphSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, path: Arc<StatePath>) {
            self.paths.insert(path.code_name.clone(), path);
        }

        /// How many loads reached the source (for cache assertions).
        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StateGraphSource for MemoryGraphSource {
        async fn load_path(&self, code_name: &str) -> Result<Option<Arc<StatePath>>, StoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.paths.get(code_name).map(|entry| entry.value().clone()))
        }
    }
}
