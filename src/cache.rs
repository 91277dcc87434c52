// src/cache.rs - Memoization of external results keyed by image content

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::Result;
use crate::merge::ExternalResult;

/// SHA-256 of the raw image bytes as lowercase hex
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Store for externally produced results. Lives at the I/O boundary only;
/// the analysis core never reads from it.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<ExternalResult>;
    fn put(&self, key: &str, value: ExternalResult);
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, ExternalResult>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<ExternalResult> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself is still usable.
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn put(&self, key: &str, value: ExternalResult) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
    }
}

/// Return the cached result for `key`, or run `load` and remember what it
/// produced. Without a cache this is just `load()`.
pub fn cached_or_load<F>(
    cache: Option<&dyn ResultCache>,
    key: &str,
    load: F,
) -> Result<Option<ExternalResult>>
where
    F: FnOnce() -> Result<Option<ExternalResult>>,
{
    let Some(cache) = cache else {
        return load();
    };

    if let Some(hit) = cache.get(key) {
        log::debug!("External result cache hit for {}", key);
        return Ok(Some(hit));
    }

    let loaded = load()?;
    if let Some(result) = &loaded {
        cache.put(key, result.clone());
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn hash_is_stable_hex() {
        let hash = content_hash(b"abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(content_hash(b"abc"), hash);
        assert_ne!(content_hash(b"abd"), hash);
    }

    #[test]
    fn loader_runs_once_per_key() {
        let cache = MemoryCache::new();
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(Some(ExternalResult {
                health_score: Some(70.0),
                ..ExternalResult::default()
            }))
        };

        let first = cached_or_load(Some(&cache), "k", load).unwrap();
        let second = cached_or_load(Some(&cache), "k", || unreachable!()).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_results_are_not_cached() {
        let cache = MemoryCache::new();
        let loaded = cached_or_load(Some(&cache), "k", || Ok(None)).unwrap();
        assert!(loaded.is_none());
        assert!(cache.is_empty());
    }
}
