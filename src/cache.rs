//! Session-scoped response cache
//!
//! Best-effort key/value store for directory pages, review lists and review
//! metadata. A hit short-circuits a fetch; a failed write or an undecodable
//! entry is never an error, only a miss.

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::config::CacheSettings;
use crate::types::{GameId, PageQuery, PlayerId};

/// Key prefixes owned by this crate
pub const CACHE_PREFIXES: [&str; 3] = ["ogs.games.", "ogs.ai.", "ogs.review."];

/// Session cache contract
pub trait SessionCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    /// Remove every entry whose key starts with one of `prefixes`
    fn clear(&self, prefixes: &[&str]);
}

/// Typed read; an entry that no longer decodes counts as a miss
pub fn get_typed<T: DeserializeOwned>(cache: &dyn SessionCache, key: &str) -> Option<T> {
    let value = cache.get(key)?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Discarding undecodable cache entry {}: {}", key, e);
            None
        }
    }
}

/// Typed write; serialization failures are logged and dropped
pub fn set_typed<T: Serialize>(cache: &dyn SessionCache, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(encoded) => cache.set(key, encoded),
        Err(e) => warn!("Skipping cache write for {}: {}", key, e),
    }
}

pub fn games_page_key(player: PlayerId, page: u32, query: &PageQuery) -> String {
    let ranked = match query.ranked {
        Some(true) => "true",
        Some(false) => "false",
        None => "all",
    };
    format!(
        "ogs.games.{}.page.{}.{}.{}",
        player, page, ranked, query.page_size
    )
}

pub fn review_list_key(game: GameId) -> String {
    format!("ogs.review.{}", game)
}

pub fn review_key(game: GameId) -> String {
    format!("ogs.ai.{}", game)
}

/// In-memory LRU cache
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Value>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key.to_string(), value);
        }
    }

    fn clear(&self, prefixes: &[&str]) {
        if let Ok(mut entries) = self.entries.lock() {
            let doomed: Vec<String> = entries
                .iter()
                .map(|(key, _)| key)
                .filter(|key| prefixes.iter().any(|prefix| key.starts_with(prefix)))
                .cloned()
                .collect();
            for key in &doomed {
                entries.pop(key);
            }
            debug!("Cleared {} cache entries", doomed.len());
        }
    }
}

/// Cache for a session; a capacity of zero turns caching off
pub fn session_cache(settings: &CacheSettings) -> Arc<dyn SessionCache> {
    if settings.capacity == 0 {
        debug!("Session cache disabled");
        Arc::new(NoopCache)
    } else {
        Arc::new(MemoryCache::new(settings.capacity))
    }
}

/// Cache that stores nothing
pub struct NoopCache;

impl SessionCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value) {}

    fn clear(&self, _prefixes: &[&str]) {}
}
