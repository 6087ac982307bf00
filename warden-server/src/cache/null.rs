use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A cache that stores nothing.
///
/// With this backend every pending login is forgotten immediately, so
/// callbacks fail their state check. It only makes sense for deployments
/// that terminate logins elsewhere and use this server for authorization.
#[derive(Clone, Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn set<T: Serialize + Send + Sync>(&self, _key: &str, _value: &T) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get<T: DeserializeOwned + Send + Sync>(&self, _key: &str) -> Result<Option<T>, CacheError> {
        Ok(None)
    }

    async fn take<T: DeserializeOwned + Send + Sync>(&self, _key: &str) -> Result<Option<T>, CacheError> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
