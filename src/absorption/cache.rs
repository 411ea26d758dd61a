//! Bounded least-recently-used cache of loaded datasets.
//!
//! The cache maps filenames (relative to the database root) to shared
//! [`Dataset`] handles. A hit refreshes the entry's recency; a miss loads the
//! dataset and evicts the least recently used entry if the cache is full.
//!
//! The cache is the only mutable state of an
//! [`AbsorptionDatabase`](crate::absorption::AbsorptionDatabase): every method
//! touching it takes `&mut self`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;

use crate::ckdkit_errors::CkdkitError;
use crate::netcdf::Dataset;

/// Counters of cache events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub loads: usize,
    pub evictions: usize,
}

pub struct DatasetCache {
    entries: LruCache<String, Arc<Dataset>>,
    stats: CacheStats,
}

impl std::fmt::Debug for DatasetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCache")
            .field("capacity", &self.entries.cap())
            .field("len", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Result<Self, CkdkitError> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            CkdkitError::InvalidArgument("dataset cache capacity must be at least 1".into())
        })?;
        Ok(DatasetCache {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Whether `key` is resident; does not refresh its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Cached dataset for `key`, or the result of `load` inserted in the cache.
    pub fn get_or_try_insert<F>(
        &mut self,
        key: &str,
        load: F,
    ) -> Result<Arc<Dataset>, CkdkitError>
    where
        F: FnOnce() -> Result<Dataset, CkdkitError>,
    {
        if let Some(ds) = self.entries.get(key) {
            self.stats.hits += 1;
            return Ok(Arc::clone(ds));
        }
        let ds = Arc::new(load()?);
        self.stats.loads += 1;
        if let Some((evicted, _)) = self.entries.push(key.to_string(), Arc::clone(&ds)) {
            if evicted != key {
                debug!("Evicting '{evicted}' from the dataset cache");
                self.stats.evictions += 1;
            }
        }
        Ok(ds)
    }

    /// Release the file handles of lazily loaded entries; entries stay cached.
    pub fn close_all(&self) {
        for (_, ds) in self.entries.iter() {
            ds.close();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
