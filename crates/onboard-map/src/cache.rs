//! Memoization of combiner results.
//!
//! Keys are SHA-256 digests of everything that influences a suggestion, so a
//! hit always returns what a recomputation would. The cache can be cleared at
//! any time without changing answers.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use onboard_model::{ColumnDescriptor, FieldDescriptor, MappingSuggestion, MatchContext};
use serde::Serialize;
use sha2::Digest;

use crate::config::MatcherConfig;
use crate::hybrid::{Normalization, Weights};

/// Algorithm identifier baked into every key.
const KEY_ALGORITHM: &str = "hybrid";

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// Deterministic digest of one suggestion request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct KeyMaterial<'a> {
    field_name: &'a str,
    columns: Vec<&'a str>,
    algorithm: &'static str,
    threshold: f64,
    context: &'a MatchContext,
    fingerprint: Fingerprint<'a>,
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    field: &'a FieldDescriptor,
    columns: &'a [ColumnDescriptor],
    weights: &'a Weights,
    normalization: Normalization,
    min_score: f64,
    semantic_enabled: bool,
}

impl CacheKey {
    /// Key for a request; `None` if the inputs cannot be serialized, in which
    /// case the request simply bypasses the cache.
    pub fn new(
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
        config: &MatcherConfig,
    ) -> Option<Self> {
        let mut sorted: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        sorted.sort_unstable();
        let material = KeyMaterial {
            field_name: &field.name,
            columns: sorted,
            algorithm: KEY_ALGORITHM,
            threshold: config.fuzzy_threshold,
            context,
            fingerprint: Fingerprint {
                field,
                columns,
                weights: &config.weights,
                normalization: config.normalization,
                min_score: config.min_score,
                semantic_enabled: config.semantic_enabled,
            },
        };
        let bytes = serde_json::to_vec(&material).ok()?;
        Some(Self(sha256_hex(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: MappingSuggestion,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, if any lookups happened.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }
}

/// Thread-safe suggestion cache with optional per-entry TTL.
///
/// Expiry is checked lazily on read: an expired entry is evicted and
/// reported as a miss.
#[derive(Debug, Default)]
pub struct SuggestionCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl SuggestionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose entries expire `ttl` after insertion unless a TTL is
    /// given explicitly to [`SuggestionCache::set`].
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            default_ttl: Some(ttl),
            ..Self::default()
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<MappingSuggestion> {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value. `ttl` overrides the cache default; `None` uses it.
    pub fn set(&self, key: CacheKey, value: MappingSuggestion, ttl: Option<Duration>) {
        let expires_at = ttl
            .or(self.default_ttl)
            .and_then(|ttl| Instant::now().checked_add(ttl));
        self.lock().insert(key, CacheEntry { value, expires_at });
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Return the cached value or compute, store and return a fresh one.
    pub fn get_or_insert_with(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> MappingSuggestion,
    ) -> MappingSuggestion {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = compute();
        self.set(key, value.clone(), None);
        value
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_model::Algorithm;

    fn key(field: &str, columns: &[&str]) -> CacheKey {
        let columns: Vec<ColumnDescriptor> =
            columns.iter().map(|c| ColumnDescriptor::new(*c)).collect();
        CacheKey::new(
            &FieldDescriptor::new(field),
            &columns,
            &MatchContext::default(),
            &MatcherConfig::default(),
        )
        .expect("serializable key")
    }

    fn suggestion() -> MappingSuggestion {
        MappingSuggestion::mapped("DOB", "Date_of_Birth", 1.0, Algorithm::Hybrid)
    }

    #[test]
    fn sha256_hex_is_stable() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn key_is_deterministic_and_input_sensitive() {
        let a = key("DOB", &["A", "B"]);
        assert_eq!(a, key("DOB", &["A", "B"]));
        assert_ne!(a, key("DOB", &["A", "C"]));
        assert_ne!(a, key("Dob", &["A", "B"]));
        assert_eq!(a.as_str().len(), 64);

        let strict = CacheKey::new(
            &FieldDescriptor::new("DOB"),
            &[ColumnDescriptor::new("A"), ColumnDescriptor::new("B")],
            &MatchContext::default(),
            &MatcherConfig::strict(),
        );
        assert_ne!(Some(a), strict);
    }

    #[test]
    fn column_order_is_part_of_the_fingerprint() {
        assert_ne!(key("DOB", &["A", "B"]), key("DOB", &["B", "A"]));
    }

    #[test]
    fn hit_and_miss_counters() {
        let cache = SuggestionCache::new();
        let k = key("DOB", &["Date_of_Birth"]);
        assert!(cache.get(&k).is_none());
        cache.set(k.clone(), suggestion(), None);
        assert_eq!(cache.get(&k), Some(suggestion()));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hit_ratio(), Some(0.5));
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = SuggestionCache::new();
        let k = key("DOB", &["Date_of_Birth"]);
        cache.set(k.clone(), suggestion(), Some(Duration::ZERO));
        assert!(!cache.contains(&k));
        assert!(cache.get(&k).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn purge_and_clear() {
        let cache = SuggestionCache::with_ttl(Duration::ZERO);
        cache.set(key("A", &["X"]), suggestion(), None);
        cache.set(key("B", &["X"]), suggestion(), Some(Duration::from_secs(3600)));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_insert_with_computes_once() {
        let cache = SuggestionCache::new();
        let k = key("DOB", &["Date_of_Birth"]);
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache.get_or_insert_with(k.clone(), || {
                calls += 1;
                suggestion()
            });
            assert_eq!(value, suggestion());
        }
        assert_eq!(calls, 1);
    }
}
