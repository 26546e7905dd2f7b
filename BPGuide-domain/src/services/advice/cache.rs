use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::Fingerprint;

/// Default lifetime of a cached answer
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default maximum number of cached answers
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug)]
struct CacheEntry {
    text: String,
    inserted_at: Instant,
    /// Matches the insertion-order slot that owns this entry
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Insertion order; slots whose seq no longer matches the entry are stale
    order: VecDeque<(Fingerprint, u64)>,
    next_seq: u64,
}

/// Fingerprint to advice text, with fixed expiry and FIFO eviction
#[derive(Debug)]
pub struct AdviceCache {
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl Default for AdviceCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl AdviceCache {
    /// Create a cache; a zero capacity is treated as one
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // Every critical section leaves the maps consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }

    /// Look up a live entry, evicting it if it has expired
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        let now = Instant::now();
        let mut state = self.lock();

        match state.entries.get(fingerprint) {
            None => return None,
            Some(entry) if !self.is_expired(entry, now) => return Some(entry.text.clone()),
            Some(_) => {}
        }

        state.entries.remove(fingerprint);
        debug!("Advice cache entry {} expired", fingerprint);
        None
    }

    /// Insert or refresh an entry, evicting the oldest when full
    pub fn put(&self, fingerprint: Fingerprint, text: String) {
        let now = Instant::now();
        let mut state = self.lock();

        let seq = state.next_seq;
        state.next_seq += 1;

        let replaced = state
            .entries
            .insert(fingerprint, CacheEntry { text, inserted_at: now, seq })
            .is_some();
        state.order.push_back((fingerprint, seq));

        if !replaced {
            while state.entries.len() > self.capacity {
                let Some((oldest, oldest_seq)) = state.order.pop_front() else {
                    break;
                };
                let owns_entry = state
                    .entries
                    .get(&oldest)
                    .map_or(false, |entry| entry.seq == oldest_seq);
                if owns_entry {
                    state.entries.remove(&oldest);
                    debug!("Advice cache full, evicted {}", oldest);
                }
            }
        }
    }

    /// Drop every expired entry and compact the insertion order
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        let before = state.entries.len();

        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);

        let CacheState { entries, order, .. } = &mut *state;
        order.retain(|(fingerprint, seq)| {
            entries.get(fingerprint).map_or(false, |entry| entry.seq == *seq)
        });

        before - state.entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(user_id: i64) -> Fingerprint {
        Fingerprint::new(user_id, 120, 80)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_before_ttl() {
        let cache = AdviceCache::new(Duration::from_secs(3600), 10);
        cache.put(fp(1234), "Keep it up".to_string());

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert_eq!(cache.get(&fp(1234)).as_deref(), Some("Keep it up"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_at_ttl_boundary() {
        let cache = AdviceCache::new(Duration::from_secs(3600), 10);
        cache.put(fp(1234), "Keep it up".to_string());

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.get(&fp(1234)), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reput_refreshes_expiry() {
        let cache = AdviceCache::new(Duration::from_secs(10), 10);
        cache.put(fp(1234), "old".to_string());

        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(fp(1234), "new".to_string());

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&fp(1234)).as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let cache = AdviceCache::new(Duration::from_secs(3600), 2);
        cache.put(fp(1001), "a".to_string());
        cache.put(fp(1002), "b".to_string());
        cache.put(fp(1003), "c".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&fp(1001)), None);
        assert_eq!(cache.get(&fp(1002)).as_deref(), Some("b"));
        assert_eq!(cache.get(&fp(1003)).as_deref(), Some("c"));
    }

    #[test]
    fn test_refreshed_entry_moves_to_back_of_queue() {
        let cache = AdviceCache::new(Duration::from_secs(3600), 2);
        cache.put(fp(1001), "a".to_string());
        cache.put(fp(1002), "b".to_string());
        cache.put(fp(1001), "a2".to_string());
        cache.put(fp(1003), "c".to_string());

        assert_eq!(cache.get(&fp(1002)), None);
        assert_eq!(cache.get(&fp(1001)).as_deref(), Some("a2"));
        assert_eq!(cache.get(&fp(1003)).as_deref(), Some("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = AdviceCache::new(Duration::from_secs(60), 10);
        cache.put(fp(1001), "a".to_string());
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.put(fp(1002), "b".to_string());
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&fp(1002)).as_deref(), Some("b"));
    }
}
