//! Per-session ad cache
//!
//! Memory only and scoped to one provider. Entries are never evicted: once a
//! key has an ad or is marked no-fill, surfaces stop fetching for it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::types::AdData;

/// Identifies one ad placement within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub slot: String,
    pub position: u32,
}

impl SlotKey {
    pub fn new(slot: impl Into<String>, position: u32) -> Self {
        Self {
            slot: slot.into(),
            position,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.position)
    }
}

/// Caches shared by every surface of a provider
#[derive(Debug, Default)]
pub struct SessionStore {
    ads: RwLock<HashMap<SlotKey, AdData>>,
    heights: RwLock<HashMap<SlotKey, u32>>,
    no_fill: RwLock<HashSet<SlotKey>>,
    last_fetch: RwLock<Option<Instant>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_cached_ad(&self, key: &SlotKey) -> Option<AdData> {
        self.ads.read().await.get(key).cloned()
    }

    pub async fn cache_ad(&self, key: &SlotKey, ad: AdData) {
        tracing::debug!("Caching ad {} for {}", ad.id, key);
        self.ads.write().await.insert(key.clone(), ad);
    }

    pub async fn get_cached_height(&self, key: &SlotKey) -> Option<u32> {
        self.heights.read().await.get(key).copied()
    }

    pub async fn cache_height(&self, key: &SlotKey, height: u32) {
        self.heights.write().await.insert(key.clone(), height);
    }

    pub async fn has_no_fill(&self, key: &SlotKey) -> bool {
        self.no_fill.read().await.contains(key)
    }

    pub async fn mark_no_fill(&self, key: &SlotKey) {
        if self.no_fill.write().await.insert(key.clone()) {
            tracing::debug!("Marked {} as no-fill", key);
        }
    }

    /// Most recent fetch issued by any surface of this session
    pub async fn last_fetch_at(&self) -> Option<Instant> {
        *self.last_fetch.read().await
    }

    /// Record that a fetch was issued now
    pub async fn note_fetch(&self, at: Instant) {
        let mut last = self.last_fetch.write().await;
        if last.is_none_or(|prev| prev < at) {
            *last = Some(at);
        }
    }

    /// Number of cached ads, for diagnostics
    pub async fn cached_ad_count(&self) -> usize {
        self.ads.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_slot_key_display() {
        assert_eq!(SlotKey::new("feed", 3).to_string(), "feed:3");
    }

    #[tokio::test]
    async fn test_ad_and_height_cache() {
        let store = SessionStore::new();
        let key = SlotKey::new("feed", 0);
        let other = SlotKey::new("feed", 1);

        assert!(store.get_cached_ad(&key).await.is_none());
        store.cache_ad(&key, AdData::new("ad_1", "native")).await;
        store.cache_height(&key, 250).await;

        assert_eq!(store.get_cached_ad(&key).await.unwrap().id, "ad_1");
        assert_eq!(store.get_cached_height(&key).await, Some(250));
        assert!(store.get_cached_ad(&other).await.is_none());
        assert_eq!(store.cached_ad_count().await, 1);
    }

    #[tokio::test]
    async fn test_no_fill_is_sticky() {
        let store = SessionStore::new();
        let key = SlotKey::new("chat", 2);

        assert!(!store.has_no_fill(&key).await);
        store.mark_no_fill(&key).await;
        store.mark_no_fill(&key).await;
        assert!(store.has_no_fill(&key).await);
    }

    #[tokio::test]
    async fn test_last_fetch_only_moves_forward() {
        let store = SessionStore::new();
        let earlier = Instant::now();
        let later = earlier + Duration::from_millis(500);

        store.note_fetch(later).await;
        store.note_fetch(earlier).await;
        assert_eq!(store.last_fetch_at().await, Some(later));
    }
}
