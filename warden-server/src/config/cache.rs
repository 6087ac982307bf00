use confique::Config;

/// Which cache backend the server uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStore {
    InMemory,
    Redis,
    None,
}

/// Cache configuration
#[derive(Debug, Config, Clone)]
pub struct CacheConfig {
    /// Cached identity TTL in seconds (default: 1 hour)
    #[config(env = "WARDEN_CACHE_TTL", default = 3600)]
    pub ttl: u64,

    /// Cache store type: "memory", "redis" or "none" (default: memory)
    #[config(env = "WARDEN_CACHE_STORE", default = "memory")]
    pub store: String,

    /// In-memory cache settings
    #[config(nested)]
    pub memory: InMemoryConfig,

    /// Redis cache settings
    #[config(nested)]
    pub redis: RedisConfig,
}

impl CacheConfig {
    /// Resolve the configured store name to a backend kind.
    /// Unrecognized names disable caching.
    pub fn store_kind(&self) -> CacheStore {
        match self.store.as_str() {
            "memory" | "in-memory" => CacheStore::InMemory,
            "redis" => CacheStore::Redis,
            _ => CacheStore::None,
        }
    }
}

/// In-memory cache configuration
#[derive(Debug, Config, Clone)]
pub struct InMemoryConfig {
    /// Maximum cache capacity in MiB (default: 128)
    #[config(env = "WARDEN_CACHE_MEMORY_CAPACITY", default = 128)]
    pub capacity_mib: usize,
}

/// Redis cache configuration
#[derive(Debug, Config, Clone)]
pub struct RedisConfig {
    /// Redis connection string, e.g. redis://localhost:6379
    #[config(env = "WARDEN_CACHE_REDIS_URL", default = "")]
    pub url: String,
}
