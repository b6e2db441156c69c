use super::CacheStore;
use anyhow::{anyhow, Result};
use mini_moka::sync::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

const GENERATION_STRIPES: usize = 64;

/// Process-local cache with a fixed time-to-live per entry.
///
/// Deletes bump a generation counter shared by every key hashing to the same
/// stripe. Conditional fills compare against it under the stripe lock, so a
/// fill that raced a delete is dropped instead of resurrecting the old value.
pub struct InMemoryCacheStore {
    entries: Cache<String, String>,
    generations: Vec<Mutex<u64>>,
}

impl InMemoryCacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_entries)
                .build(),
            generations: (0..GENERATION_STRIPES).map(|_| Mutex::new(0)).collect(),
        }
    }

    /// Approximate, eviction and expiry are applied lazily.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    fn stripe(&self, key: &str) -> Result<MutexGuard<'_, u64>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.generations.len() as u64) as usize;
        self.generations[index]
            .lock()
            .map_err(|_| anyhow!("Cache generation lock poisoned"))
    }
}

impl CacheStore for InMemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(&key.to_string()))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut generation = self.stripe(key)?;
        self.entries.invalidate(&key.to_string());
        *generation += 1;
        Ok(())
    }

    fn generation(&self, key: &str) -> Result<u64> {
        Ok(*self.stripe(key)?)
    }

    fn set_if_generation(&self, key: &str, value: String, generation: u64) -> Result<bool> {
        let current = self.stripe(key)?;
        if *current != generation {
            return Ok(false);
        }
        self.entries.insert(key.to_string(), value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_deletes_entries() {
        let cache = InMemoryCacheStore::new(Duration::from_secs(60));
        cache.set("album_with_songs:a", "{}".to_string()).unwrap();
        assert_eq!(cache.get("album_with_songs:a").unwrap().as_deref(), Some("{}"));

        cache.delete("album_with_songs:a").unwrap();
        assert_eq!(cache.get("album_with_songs:a").unwrap(), None);
        // Deleting a missing key is fine.
        cache.delete("album_with_songs:a").unwrap();
    }

    #[test]
    fn expired_entries_are_invisible() {
        let cache = InMemoryCacheStore::new(Duration::from_millis(50));
        cache.set("k", "1".to_string()).unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("1"));

        std::thread::sleep(Duration::from_millis(120));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn fill_after_delete_is_refused() {
        let cache = InMemoryCacheStore::new(Duration::from_secs(60));
        let before = cache.generation("total_album_likes:a").unwrap();

        cache.delete("total_album_likes:a").unwrap();
        assert_ne!(cache.generation("total_album_likes:a").unwrap(), before);
        assert!(!cache
            .set_if_generation("total_album_likes:a", "0".to_string(), before)
            .unwrap());
        assert_eq!(cache.get("total_album_likes:a").unwrap(), None);

        let current = cache.generation("total_album_likes:a").unwrap();
        assert!(cache
            .set_if_generation("total_album_likes:a", "1".to_string(), current)
            .unwrap());
        assert_eq!(
            cache.get("total_album_likes:a").unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn plain_writes_do_not_bump_generation() {
        let cache = InMemoryCacheStore::new(Duration::from_secs(60));
        let before = cache.generation("k").unwrap();
        cache.set("k", "1".to_string()).unwrap();
        assert_eq!(cache.generation("k").unwrap(), before);
    }
}
