use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{
    GeoPoint, InsertOutcome, Match, NearbyProfile, Preferences, Profile, SwipeAction,
    SwipeHistory, UserPair,
};
use crate::services::store::{GeoIndex, MatchStore, ProfileSource, StoreError, SwipeStore};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache; L2 is an optional Redis shared across
/// instances. Values are stored as JSON.
pub struct CacheManager {
    redis: Option<ConnectionManager>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager, connecting to Redis when a URL is given
    pub async fn new(
        redis_url: Option<&str>,
        l1_size: u64,
        ttl_secs: u64,
    ) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                Some(ConnectionManager::new(client).await?)
            }
            None => None,
        };

        Ok(Self {
            redis,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// L1-only cache, no network
    pub fn in_process(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_l2(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }

        let Some(redis) = &self.redis else {
            tracing::trace!("Cache miss: {}", key);
            return Ok(None);
        };

        let mut conn = redis.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;

        match value {
            Some(json) => {
                tracing::trace!("L2 cache hit: {}", key);
                let parsed = serde_json::from_str(&json)?;
                self.l1_cache
                    .insert(key.to_string(), json.into_bytes())
                    .await;
                Ok(Some(parsed))
            }
            None => {
                tracing::trace!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        }
        Ok(())
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for user preferences
    pub fn preferences(user_id: &str) -> String {
        format!("prefs:{}", user_id)
    }

    /// Build a cache key for user profile
    pub fn profile(user_id: &str) -> String {
        format!("profile:{}", user_id)
    }
}

/// Store decorator that caches profile and preference reads
///
/// Only records owned by the profile-data collaborator are cached. Swipe and
/// match state always goes to the wrapped store. Cache failures are logged
/// and fall through to the store.
pub struct CachingStore {
    inner: Arc<dyn MatchStore>,
    cache: CacheManager,
}

impl CachingStore {
    pub fn new(inner: Arc<dyn MatchStore>, cache: CacheManager) -> Self {
        Self { inner, cache }
    }

    /// Drop cached records for a user after a profile edit
    pub async fn invalidate(&self, user_id: &str) {
        for key in [CacheKey::profile(user_id), CacheKey::preferences(user_id)] {
            if let Err(e) = self.cache.delete(&key).await {
                tracing::warn!("Failed to invalidate cache key {}: {}", key, e);
            }
        }
    }

    async fn cached<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn remember<T>(&self, key: &str, value: &T)
    where
        T: Serialize,
    {
        if let Err(e) = self.cache.set(key, value).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }
}

#[async_trait]
impl ProfileSource for CachingStore {
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let key = CacheKey::profile(user_id);
        if let Some(profile) = self.cached::<Profile>(&key).await {
            return Ok(Some(profile));
        }

        let profile = self.inner.profile(user_id).await?;
        if let Some(profile) = &profile {
            self.remember(&key, profile).await;
        }
        Ok(profile)
    }

    async fn preferences(&self, user_id: &str) -> Result<Option<Preferences>, StoreError> {
        let key = CacheKey::preferences(user_id);
        if let Some(preferences) = self.cached::<Preferences>(&key).await {
            return Ok(Some(preferences));
        }

        let preferences = self.inner.preferences(user_id).await?;
        if let Some(preferences) = &preferences {
            self.remember(&key, preferences).await;
        }
        Ok(preferences)
    }
}

#[async_trait]
impl GeoIndex for CachingStore {
    async fn within_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<NearbyProfile>, StoreError> {
        self.inner.within_radius(center, radius_m).await
    }
}

#[async_trait]
impl SwipeStore for CachingStore {
    async fn insert_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        action: SwipeAction,
    ) -> Result<InsertOutcome, StoreError> {
        self.inner.insert_swipe(actor_id, target_id, action).await
    }

    async fn like_exists(&self, actor_id: &str, target_id: &str) -> Result<bool, StoreError> {
        self.inner.like_exists(actor_id, target_id).await
    }

    async fn swipe_history(&self, user_id: &str) -> Result<SwipeHistory, StoreError> {
        self.inner.swipe_history(user_id).await
    }

    async fn try_insert_match(&self, new_match: &Match) -> Result<InsertOutcome, StoreError> {
        self.inner.try_insert_match(new_match).await
    }

    async fn find_match(&self, pair: &UserPair) -> Result<Option<Match>, StoreError> {
        self.inner.find_match(pair).await
    }

    async fn matches_for(&self, user_id: &str) -> Result<Vec<Match>, StoreError> {
        self.inner.matches_for(user_id).await
    }
}

#[async_trait]
impl MatchStore for CachingStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new(Some("redis://127.0.0.1:6379"), 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: Option<String> = cache.get(key).await.unwrap();
        assert_eq!(result.as_deref(), Some(value));

        cache.delete(key).await.unwrap();
        assert!(cache.get::<String>(key).await.unwrap().is_none());
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::preferences("user123"), "prefs:user123");
        assert_eq!(CacheKey::profile("user123"), "profile:user123");
    }

    #[tokio::test]
    async fn test_in_process_round_trip() {
        let cache = CacheManager::in_process(100, 60);
        assert!(!cache.has_l2());

        cache.set("k", &42u32).await.unwrap();
        assert_eq!(cache.get::<u32>("k").await.unwrap(), Some(42));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get::<u32>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_caching_store_serves_stale_profile_until_invalidated() {
        let memory = Arc::new(MemoryStore::default());
        memory
            .upsert_profile(Profile::new("a", "Before", 30))
            .await
            .unwrap();

        let store = CachingStore::new(memory.clone(), CacheManager::in_process(100, 60));
        assert_eq!(store.profile("a").await.unwrap().unwrap().name, "Before");

        memory
            .upsert_profile(Profile::new("a", "After", 30))
            .await
            .unwrap();
        assert_eq!(store.profile("a").await.unwrap().unwrap().name, "Before");

        store.invalidate("a").await;
        assert_eq!(store.profile("a").await.unwrap().unwrap().name, "After");
    }

    #[tokio::test]
    async fn test_caching_store_does_not_cache_absent_records() {
        let memory = Arc::new(MemoryStore::default());
        let store = CachingStore::new(memory.clone(), CacheManager::in_process(100, 60));

        assert!(store.profile("late").await.unwrap().is_none());
        memory
            .upsert_profile(Profile::new("late", "Late", 30))
            .await
            .unwrap();
        assert!(store.profile("late").await.unwrap().is_some());
    }
}
