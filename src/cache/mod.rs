//! Best-effort read-through cache for album views.
//!
//! The persistent store is always the source of truth. Entries are deleted (never
//! updated) by every write path that touches them. Read-side backend failures
//! degrade to a plain miss; a failed delete is returned to the write path.

mod in_memory;

pub use in_memory::InMemoryCacheStore;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

pub trait CacheStore: Send + Sync {
    /// Returns Ok(None) on a miss.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes the entry and advances the key's generation.
    fn delete(&self, key: &str) -> Result<()>;

    fn generation(&self, key: &str) -> Result<u64>;

    /// Stores `value` only if `key` has not been deleted since `generation` was read.
    fn set_if_generation(&self, key: &str, value: String, generation: u64) -> Result<bool>;
}

pub fn album_with_songs_key(album_id: &str) -> String {
    format!("album_with_songs:{}", album_id)
}

pub fn total_album_likes_key(album_id: &str) -> String {
    format!("total_album_likes:{}", album_id)
}

/// Where a read was served from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Database,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Cache => "cache",
            DataSource::Database => "db",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Sourced<T> {
    pub fn from_cache(value: T) -> Self {
        Sourced {
            value,
            source: DataSource::Cache,
        }
    }

    pub fn from_database(value: T) -> Self {
        Sourced {
            value,
            source: DataSource::Database,
        }
    }
}

/// Outcome of [`lookup`]. A miss carries the token the caller hands back to [`populate`].
pub enum Lookup<T> {
    Hit(T),
    Miss(FillToken),
}

/// Generation of a key observed before the persistent read that will fill it.
#[derive(Debug)]
pub struct FillToken {
    generation: Option<u64>,
}

/// Looks up and decodes a cached value. Backend errors and undecodable payloads are misses.
pub fn lookup<T: DeserializeOwned>(cache: &dyn CacheStore, key: &str) -> Lookup<T> {
    let generation = match cache.generation(key) {
        Ok(generation) => Some(generation),
        Err(err) => {
            warn!("Cache generation read for {} failed: {}", key, err);
            None
        }
    };
    let miss = || Lookup::Miss(FillToken { generation });

    let raw = match cache.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("Cache miss for {}", key);
            return miss();
        }
        Err(err) => {
            warn!("Cache read for {} failed, falling back to storage: {}", key, err);
            return miss();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => {
            debug!("Cache hit for {}", key);
            Lookup::Hit(value)
        }
        Err(err) => {
            warn!("Discarding undecodable cache entry {}: {}", key, err);
            miss()
        }
    }
}

/// Encodes and stores a value read after `token` was taken, logging rather than failing.
/// Nothing is stored if the key was invalidated in between.
pub fn populate<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T, token: FillToken) {
    let Some(generation) = token.generation else {
        return;
    };
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!("Could not encode cache entry {}: {}", key, err);
            return;
        }
    };
    match cache.set_if_generation(key, encoded, generation) {
        Ok(true) => {}
        Ok(false) => debug!("Skipped filling {}, invalidated during the read", key),
        Err(err) => warn!("Cache write for {} failed: {}", key, err),
    }
}

/// Deletes every key, returning the first failure once all deletes were attempted.
pub fn invalidate(cache: &dyn CacheStore, keys: &[String]) -> Result<()> {
    let mut failure = None;
    for key in keys {
        match cache.delete(key) {
            Ok(()) => debug!("Invalidated cache key {}", key),
            Err(err) => {
                warn!("Failed to invalidate cache key {}: {}", key, err);
                failure.get_or_insert(err.context(format!("invalidating {}", key)));
            }
        }
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::time::Duration;

    struct BrokenCache;

    impl CacheStore for BrokenCache {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow!("connection refused"))
        }

        fn set(&self, _key: &str, _value: String) -> Result<()> {
            Err(anyhow!("connection refused"))
        }

        fn delete(&self, _key: &str) -> Result<()> {
            Err(anyhow!("connection refused"))
        }

        fn generation(&self, _key: &str) -> Result<u64> {
            Err(anyhow!("connection refused"))
        }

        fn set_if_generation(&self, _key: &str, _value: String, _generation: u64) -> Result<bool> {
            Err(anyhow!("connection refused"))
        }
    }

    fn fill<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T) {
        match lookup::<serde_json::Value>(cache, key) {
            Lookup::Miss(token) => populate(cache, key, value, token),
            Lookup::Hit(_) => panic!("{} unexpectedly cached", key),
        }
    }

    #[test]
    fn keys_follow_naming_scheme() {
        assert_eq!(album_with_songs_key("album-1"), "album_with_songs:album-1");
        assert_eq!(total_album_likes_key("album-1"), "total_album_likes:album-1");
    }

    #[test]
    fn lookup_round_trips_through_json() {
        let cache = InMemoryCacheStore::new(Duration::from_secs(60));
        fill(&cache, "k", &42i64);
        assert!(matches!(lookup::<i64>(&cache, "k"), Lookup::Hit(42)));
    }

    #[test]
    fn corrupt_entries_are_misses() {
        let cache = InMemoryCacheStore::new(Duration::from_secs(60));
        cache.set("k", "{not json".to_string()).unwrap();
        assert!(matches!(lookup::<i64>(&cache, "k"), Lookup::Miss(_)));
    }

    #[test]
    fn invalidation_between_lookup_and_populate_drops_the_fill() {
        let cache = InMemoryCacheStore::new(Duration::from_secs(60));
        let Lookup::Miss(token) = lookup::<i64>(&cache, "k") else {
            panic!("empty cache hit");
        };
        invalidate(&cache, &["k".to_string()]).unwrap();
        populate(&cache, "k", &0i64, token);
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn read_failures_are_misses() {
        let cache = BrokenCache;
        let Lookup::Miss(token) = lookup::<i64>(&cache, "k") else {
            panic!("broken cache hit");
        };
        populate(&cache, "k", &1i64, token);
    }

    #[test]
    fn delete_failures_reach_the_caller() {
        let err = invalidate(&BrokenCache, &["a".to_string(), "b".to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalidating a"));
        assert!(invalidate(&BrokenCache, &[]).is_ok());
    }
}
