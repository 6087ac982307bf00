use crate::config::{CacheConfig, CacheStore};
use crate::errors::ApiError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub mod memory;
pub mod null;
pub mod redis;

pub use memory::InMemoryCache;
pub use null::NullCache;
pub use redis::RedisCache;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Error serializing a value for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error deserializing a stored value
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Error from the redis server or connection
    #[error("Redis error: {0}")]
    Redis(String),

    /// Error in the cache configuration
    #[error("Cache configuration error: {0}")]
    Config(String),
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::internal(format!("Cache error: {err}"))
    }
}

/// Backend-agnostic cache operations.
///
/// Values are serialized to JSON strings before storage, so any
/// serde-compatible type can be cached.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store a value under a key, subject to the backend's TTL.
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<(), CacheError>;

    /// Fetch the value stored under a key, if any.
    async fn get<T: DeserializeOwned + Send + Sync>(&self, key: &str) -> Result<Option<T>, CacheError>;

    /// Fetch and remove the value stored under a key.
    /// At most one concurrent caller observes a given entry.
    async fn take<T: DeserializeOwned + Send + Sync>(&self, key: &str) -> Result<Option<T>, CacheError>;

    /// Remove the value stored under a key.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<(), CacheError>;
}

/// Cache implementation dispatching to the configured backend
pub enum Cache {
    InMemory(InMemoryCache),
    Redis(RedisCache),
    Null(NullCache),
}

#[async_trait]
impl CacheBackend for Cache {
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        match self {
            Cache::InMemory(cache) => cache.set(key, value).await,
            Cache::Redis(cache) => cache.set(key, value).await,
            Cache::Null(cache) => cache.set(key, value).await,
        }
    }

    async fn get<T: DeserializeOwned + Send + Sync>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self {
            Cache::InMemory(cache) => cache.get(key).await,
            Cache::Redis(cache) => cache.get(key).await,
            Cache::Null(cache) => cache.get(key).await,
        }
    }

    async fn take<T: DeserializeOwned + Send + Sync>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self {
            Cache::InMemory(cache) => cache.take(key).await,
            Cache::Redis(cache) => cache.take(key).await,
            Cache::Null(cache) => cache.take(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Cache::InMemory(cache) => cache.delete(key).await,
            Cache::Redis(cache) => cache.delete(key).await,
            Cache::Null(cache) => cache.delete(key).await,
        }
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        match self {
            Cache::InMemory(cache) => cache.health_check().await,
            Cache::Redis(cache) => cache.health_check().await,
            Cache::Null(cache) => cache.health_check().await,
        }
    }
}

/// Create a cache with the configured backend and the given entry TTL.
///
/// The TTL is a parameter rather than part of the config because the
/// server keeps two caches with different lifetimes, one for cached
/// identities and one for pending logins.
pub async fn create_cache(config: &CacheConfig, ttl_secs: u64) -> Result<Cache, CacheError> {
    match config.store_kind() {
        CacheStore::InMemory => {
            log::info!("Creating in-memory cache (ttl {ttl_secs}s)");
            let cache = InMemoryCache::new(ttl_secs, config.memory.capacity_mib)?;
            Ok(Cache::InMemory(cache))
        }
        CacheStore::Redis => {
            log::info!("Creating redis cache (ttl {ttl_secs}s)");
            let cache = RedisCache::new(&config.redis.url, ttl_secs).await?;
            Ok(Cache::Redis(cache))
        }
        CacheStore::None => {
            log::info!("Cache disabled, using null backend");
            Ok(Cache::Null(NullCache::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InMemoryConfig, RedisConfig};
    use serde::Deserialize;

    fn memory_config() -> CacheConfig {
        CacheConfig {
            ttl: 60,
            store: "memory".to_string(),
            memory: InMemoryConfig { capacity_mib: 16 },
            redis: RedisConfig { url: String::new() },
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Entry {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_create_cache_memory_round_trip() {
        let cache = create_cache(&memory_config(), 60).await.unwrap();
        let entry = Entry {
            name: "a".to_string(),
            count: 3,
        };
        cache.set("entry", &entry).await.unwrap();
        let found: Option<Entry> = cache.get("entry").await.unwrap();
        assert_eq!(found, Some(entry));
    }

    #[tokio::test]
    async fn test_create_cache_null_when_disabled() {
        let mut config = memory_config();
        config.store = "none".to_string();
        let cache = create_cache(&config, 60).await.unwrap();
        cache.set("entry", &"value").await.unwrap();
        let found: Option<String> = cache.get("entry").await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_take_removes_entry() {
        let cache = create_cache(&memory_config(), 60).await.unwrap();
        cache.set("once", &"value").await.unwrap();
        let first: Option<String> = cache.take("once").await.unwrap();
        let second: Option<String> = cache.take("once").await.unwrap();
        assert_eq!(first, Some("value".to_string()));
        assert_eq!(second, None);
    }
}
