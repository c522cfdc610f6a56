//! Answer cache with TTL expiry and FIFO eviction.
//!
//! Capacity eviction removes the entry inserted earliest among those still
//! present, regardless of how often it was read. Insertion order is kept in
//! an explicit queue; queue slots left behind by overwritten or expired keys
//! are skipped on eviction and compacted away once they pile up.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use super::key::normalize;
use crate::utils::clock::Clock;

/// Provenance of a cached answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Produced by the generative collaborator
    Generated,
    /// Produced by the local rule-based responder
    Fallback,
}

/// A cache hit
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub response: String,
    pub source: ResponseSource,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: String,
    source: ResponseSource,
    inserted_at: DateTime<Utc>,
    /// Insertion sequence number, matches exactly one live queue slot
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    total_queries: u64,
}

impl CacheState {
    fn is_live(&self, seq: u64, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.seq == seq)
    }

    /// Remove the earliest inserted entry still present
    fn evict_oldest(&mut self) -> Option<String> {
        while let Some((seq, key)) = self.order.pop_front() {
            if self.is_live(seq, &key) {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn compact_order(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(seq, key)| entries.get(key).is_some_and(|e| e.seq == *seq));
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub total_queries: u64,
    /// Percentage with two decimals, 0 when nothing was queried
    pub hit_rate: f64,
    /// Every hit is one generator call avoided
    pub api_calls_saved: u64,
    pub monthly_quota_status: QuotaStatus,
}

/// Generator call estimate against the free monthly quota
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub free_quota: u64,
    /// One generator call per query
    pub estimated_usage_without_cache: u64,
    /// One generator call per miss
    pub estimated_usage_with_cache: u64,
    pub reduction_percentage: f64,
}

/// Free-tier monthly request allowance of the generator
pub const FREE_MONTHLY_QUOTA: u64 = 1500;

/// Thread-safe response cache keyed by [`normalize`].
///
/// The map, the insertion queue and the counters share one lock, so
/// check-capacity, evict and insert happen as a single step.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    capacity: usize,
    ttl: Duration,
    fallback_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    /// `capacity` is clamped to at least 1
    pub fn new(capacity: usize, ttl: Duration, fallback_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing response cache (capacity={}, ttl={}s, fallback_ttl={}s)",
            capacity,
            ttl.num_seconds(),
            fallback_ttl.num_seconds()
        );
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
            ttl,
            fallback_ttl,
            clock,
        }
    }

    /// Look up the answer for `message` in the metric's risk bucket.
    ///
    /// Every call counts as a query. Expired entries count as misses and are
    /// removed on the spot.
    pub fn get(&self, message: &str, metric: Option<f64>) -> Option<CachedResponse> {
        self.get_by_key(&normalize(message, metric))
    }

    pub fn get_by_key(&self, key: &str) -> Option<CachedResponse> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.total_queries += 1;

        let expired = state
            .entries
            .get(key)
            .map(|e| now - e.inserted_at >= self.ttl_for(e.source));

        match expired {
            Some(false) => {
                state.hits += 1;
                let hit = state.entries.get(key).map(|e| CachedResponse {
                    response: e.response.clone(),
                    source: e.source,
                    inserted_at: e.inserted_at,
                });
                debug!(
                    "Cache HIT: {} ({:.2}% hit rate)",
                    key,
                    hit_rate(state.hits, state.total_queries)
                );
                hit
            }
            Some(true) => {
                state.misses += 1;
                state.entries.remove(key);
                debug!("Cache entry expired, removed: {}", key);
                None
            }
            None => {
                state.misses += 1;
                debug!("Cache MISS: {}", key);
                None
            }
        }
    }

    /// Store an answer, overwriting any entry under the same key.
    ///
    /// A new key arriving at capacity evicts exactly one entry: the earliest
    /// inserted one still present.
    pub fn put(&self, message: &str, metric: Option<f64>, response: &str, source: ResponseSource) {
        self.put_by_key(normalize(message, metric), response, source);
    }

    pub fn put_by_key(&self, key: String, response: &str, source: ResponseSource) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            if let Some(evicted) = state.evict_oldest() {
                debug!("Cache cleanup: evicted oldest entry {}", evicted);
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.push_back((seq, key.clone()));
        state.entries.insert(
            key.clone(),
            CacheEntry {
                response: response.to_string(),
                source,
                inserted_at: now,
                seq,
            },
        );

        if state.order.len() > self.capacity.saturating_mul(2) {
            state.compact_order();
        }

        debug!("Cached {:?} response for: {}", source, key);
    }

    /// Drop every entry; counters are kept. Returns the number dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.order.clear();
        info!("Response cache cleared ({} entries)", dropped);
        dropped
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let rate = hit_rate(state.hits, state.total_queries);
        CacheStats {
            size: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
            total_queries: state.total_queries,
            hit_rate: rate,
            api_calls_saved: state.hits,
            monthly_quota_status: QuotaStatus {
                free_quota: FREE_MONTHLY_QUOTA,
                estimated_usage_without_cache: state.total_queries,
                estimated_usage_with_cache: state.total_queries - state.hits,
                reduction_percentage: rate,
            },
        }
    }

    fn ttl_for(&self, source: ResponseSource) -> Duration {
        match source {
            ResponseSource::Generated => self.ttl,
            ResponseSource::Fallback => self.fallback_ttl,
        }
    }
}

/// `hits / total * 100`, rounded to two decimals
fn hit_rate(hits: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = hits as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;

    fn cache(capacity: usize) -> (ResponseCache, ManualClock) {
        let clock = ManualClock::default();
        let cache = ResponseCache::new(
            capacity,
            Duration::hours(24),
            Duration::hours(1),
            Arc::new(clock.clone()),
        );
        (cache, clock)
    }

    #[test]
    fn test_put_then_get_hits() {
        let (cache, _clock) = cache(10);
        cache.put("What should I eat?", Some(78.0), "veggies", ResponseSource::Generated);

        let hit = cache.get("should I eat", Some(65.0)).unwrap();
        assert_eq!(hit.response, "veggies");
        assert_eq!(hit.source, ResponseSource::Generated);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total_queries, 1);
    }

    #[test]
    fn test_bucket_mismatch_misses() {
        let (cache, _clock) = cache(10);
        cache.put("what should i eat?", Some(95.0), "anything", ResponseSource::Generated);
        assert!(cache.get("what should i eat?", Some(30.0)).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_evicts_first_inserted() {
        let (cache, _clock) = cache(500);
        for i in 0..=500 {
            cache.put_by_key(format!("key{}", i), "r", ResponseSource::Generated);
        }

        assert_eq!(cache.len(), 500);
        assert!(cache.get_by_key("key0").is_none());
        assert!(cache.get_by_key("key1").is_some());
        assert!(cache.get_by_key("key500").is_some());
    }

    #[test]
    fn test_eviction_ignores_reads() {
        let (cache, _clock) = cache(2);
        cache.put_by_key("a".into(), "1", ResponseSource::Generated);
        cache.put_by_key("b".into(), "2", ResponseSource::Generated);

        // reading "a" does not protect it: FIFO, not LRU
        assert!(cache.get_by_key("a").is_some());
        cache.put_by_key("c".into(), "3", ResponseSource::Generated);

        assert!(cache.get_by_key("a").is_none());
        assert!(cache.get_by_key("b").is_some());
        assert!(cache.get_by_key("c").is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (cache, _clock) = cache(2);
        cache.put_by_key("a".into(), "1", ResponseSource::Generated);
        cache.put_by_key("b".into(), "2", ResponseSource::Generated);
        cache.put_by_key("a".into(), "1b", ResponseSource::Generated);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_by_key("a").unwrap().response, "1b");

        // "a" was re-inserted after "b", so "b" is now the oldest
        cache.put_by_key("c".into(), "3", ResponseSource::Generated);
        assert!(cache.get_by_key("b").is_none());
        assert!(cache.get_by_key("a").is_some());
    }

    #[test]
    fn test_repeated_get_does_not_mutate_entry() {
        let (cache, clock) = cache(10);
        cache.put_by_key("k".into(), "value", ResponseSource::Generated);
        let first = cache.get_by_key("k").unwrap();

        clock.advance(Duration::minutes(30));
        let second = cache.get_by_key("k").unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_expired_entry_misses_and_is_removed() {
        let (cache, clock) = cache(10);
        cache.put_by_key("k".into(), "value", ResponseSource::Generated);

        clock.advance(Duration::hours(24));
        assert!(cache.get_by_key("k").is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_fallback_entries_use_shorter_ttl() {
        let (cache, clock) = cache(10);
        cache.put_by_key("gen".into(), "g", ResponseSource::Generated);
        cache.put_by_key("fb".into(), "f", ResponseSource::Fallback);

        clock.advance(Duration::minutes(61));
        assert!(cache.get_by_key("fb").is_none());
        assert!(cache.get_by_key("gen").is_some());
    }

    #[test]
    fn test_hit_rate_rounding() {
        let (cache, _clock) = cache(10);
        assert_eq!(cache.stats().hit_rate, 0.0);

        cache.put_by_key("k".into(), "v", ResponseSource::Generated);
        cache.get_by_key("k");
        cache.get_by_key("nope");
        cache.get_by_key("nope");

        let stats = cache.stats();
        assert_eq!(stats.total_queries, 3);
        assert_eq!(stats.hits + stats.misses, stats.total_queries);
        assert_eq!(stats.hit_rate, 33.33);
        assert_eq!(stats.api_calls_saved, 1);

        let quota = &stats.monthly_quota_status;
        assert_eq!(quota.free_quota, 1500);
        assert_eq!(quota.estimated_usage_without_cache, 3);
        assert_eq!(quota.estimated_usage_with_cache, 2);
        assert_eq!(quota.reduction_percentage, 33.33);
    }

    #[test]
    fn test_queue_stays_bounded_under_overwrites() {
        let (cache, _clock) = cache(4);
        for i in 0..1_000 {
            cache.put_by_key(format!("k{}", i % 3), "v", ResponseSource::Generated);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.state.lock().order.len() <= 8);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let (cache, _clock) = cache(4);
        cache.put_by_key("k".into(), "v", ResponseSource::Generated);
        cache.get_by_key("k");
        assert_eq!(cache.clear(), 1);

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_concurrent_puts_never_exceed_capacity() {
        let (cache, _clock) = cache(50);
        let cache = Arc::new(cache);

        let writers: Vec<_> = (0..8)
            .map(|w| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..2000 {
                        cache.put_by_key(format!("w{}-{}", w, i), "v", ResponseSource::Generated);
                        cache.get_by_key(&format!("w{}-{}", w, i / 2));
                        assert!(cache.len() <= 50);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(cache.len(), 50);
        let stats = cache.stats();
        assert_eq!(stats.total_queries, 8 * 2000);
        assert_eq!(stats.hits + stats.misses, stats.total_queries);
        assert!(cache.state.lock().order.len() <= 100);
    }
}
