//! LRU cache for parsed source files with size-based eviction

use crate::types::ParsedSource;
use lru::LruCache;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// Default budget: 32MB of source text
pub const DEFAULT_CACHE_BYTES: usize = 32 * 1024 * 1024;

/// Parsed-file cache so that several frames in one file parse it once
#[derive(Debug)]
pub struct SourceCache {
    cache: LruCache<PathBuf, Arc<ParsedSource>>,
    max_size_bytes: usize,
    current_size_bytes: usize,
}

impl SourceCache {
    /// Create a new cache holding at most `max_size_bytes` of source
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            cache: LruCache::unbounded(),
            max_size_bytes,
            current_size_bytes: 0,
        }
    }

    pub fn get(&mut self, path: &Path) -> Option<Arc<ParsedSource>> {
        self.cache.get(path).cloned()
    }

    /// Insert a parsed file, evicting least recently used entries to make room
    pub fn insert(&mut self, parsed: ParsedSource) -> Arc<ParsedSource> {
        let size = Self::estimate_size(&parsed);

        while self.current_size_bytes + size > self.max_size_bytes && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                self.current_size_bytes -= Self::estimate_size(&evicted);
            }
        }

        let parsed = Arc::new(parsed);
        if let Some((_, old)) = self.cache.push(parsed.path.clone(), Arc::clone(&parsed)) {
            self.current_size_bytes -= Self::estimate_size(&old);
        }
        self.current_size_bytes += size;
        parsed
    }

    #[cfg(test)]
    fn contains(&self, path: &Path) -> bool {
        self.cache.contains(path)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache.len()
    }

    /// Source bytes dominate; the tree is roughly proportional to them
    fn estimate_size(parsed: &ParsedSource) -> usize {
        parsed.source.len() * 2
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_BYTES)
    }
}
