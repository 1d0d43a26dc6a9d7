use std::future::Future;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use hashlink::LruCache;
use retriever_config::CacheConfig;
use tracing::debug;
use utils::singleflight;

use crate::errors::{RetrievalError, Result};

/// Bounded in-memory cache of raw payloads keyed by address.
///
/// Content addressing makes every entry immutable, so entries are only ever evicted, never invalidated. Concurrent
/// misses for one key share a single fetch.
pub struct PayloadCache {
    entries: Arc<Mutex<LruCache<String, Bytes>>>,
    max_entry_size: u64,
    in_flight: singleflight::Group<Bytes, RetrievalError>,
}

impl PayloadCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(config.max_entries.max(1)))),
            max_entry_size: config.max_entry_size.as_u64(),
            in_flight: singleflight::Group::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// Insert unless the payload is larger than the per-entry limit.
    pub fn put(&self, key: &str, payload: Bytes) {
        insert_bounded(&self.entries, self.max_entry_size, key, payload);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached payload for `key`, or run `fetch` to get it, joining a fetch already in flight for the same
    /// key. The boolean is true on a cache hit.
    pub async fn get_or_fetch<F>(&self, key: &str, fetch: F) -> Result<(Bytes, bool)>
    where
        F: Future<Output = Result<Bytes>> + Send + 'static,
    {
        if let Some(payload) = self.get(key) {
            debug!(key, "Payload cache hit");
            return Ok((payload, true));
        }

        let entries = self.entries.clone();
        let max_entry_size = self.max_entry_size;
        let owned_key = key.to_owned();

        let (result, is_owner) = self
            .in_flight
            .work(key, async move {
                let payload = fetch.await?;
                insert_bounded(&entries, max_entry_size, &owned_key, payload.clone());
                Ok(payload)
            })
            .await;

        debug!(key, is_owner, "Payload cache miss");
        Ok((result?, false))
    }
}

fn insert_bounded(entries: &Mutex<LruCache<String, Bytes>>, max_entry_size: u64, key: &str, payload: Bytes) {
    if payload.len() as u64 > max_entry_size {
        debug!(key, size = payload.len(), "Payload too large to cache");
        return;
    }
    if let Ok(mut entries) = entries.lock() {
        entries.insert(key.to_owned(), payload);
    }
}
