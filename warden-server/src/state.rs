use crate::cache::{create_cache, Cache, CacheBackend, CacheError};
use crate::config::Settings;
use crate::oidc::assertion::{AssertionError, ClientAssertionSigner};
use crate::oidc::exchange::TokenExchanger;
use crate::oidc::pkce::PkceManager;
use crate::oidc::verifier::JwtVerifier;
use abac_engine::{AttributeCatalog, AttributeGrant, FilePermissionStore, PermissionStore};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Cache initialization failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Client assertion signer initialization failed: {0}")]
    Assertion(#[from] AssertionError),

    #[error("Failed to load attribute catalog from {path}: {detail}")]
    Catalog { path: String, detail: String },
}

/// Shared application state available to all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub config: Arc<Settings>,
    /// Cache of authenticated identities, keyed by subject
    pub cache: Arc<Cache>,
    /// Role permission document store
    pub permissions: Arc<dyn PermissionStore>,
    /// Attribute grants that narrow role permissions to instances
    pub catalog: Arc<AttributeCatalog>,
    /// Pending login manager
    pub pkce: Arc<PkceManager>,
    /// Client assertion signer for the token endpoint
    pub signer: Arc<ClientAssertionSigner>,
    /// Authorization code exchanger
    pub exchanger: Arc<TokenExchanger>,
    /// Bearer token verifier
    pub verifier: Arc<JwtVerifier>,
}

// Several fields (the trait object store, the caches, the signer) have
// no Debug impls, so this cannot be derived
impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Initialize the full application state from settings.
    ///
    /// Fails fast on unusable key material, an unreachable cache backend
    /// or a malformed catalog file instead of limping into traffic.
    pub async fn new(settings: Settings) -> Result<Self, StateError> {
        let identity_cache = create_cache(&settings.cache, settings.cache.ttl).await?;
        let login_cache = create_cache(&settings.cache, settings.oidc.login_ttl).await?;
        let permissions: Arc<dyn PermissionStore> =
            Arc::new(FilePermissionStore::new(&settings.authz.permissions_file));
        let catalog = load_catalog(&settings)?;
        Self::assemble(settings, identity_cache, login_cache, permissions, catalog)
    }

    fn assemble(
        settings: Settings,
        identity_cache: Cache,
        login_cache: Cache,
        permissions: Arc<dyn PermissionStore>,
        catalog: AttributeCatalog,
    ) -> Result<Self, StateError> {
        let http = create_idp_client(settings.oidc.http_timeout);
        let signer = ClientAssertionSigner::from_config(&settings.oidc)?;
        let verifier = JwtVerifier::new(
            http.clone(),
            settings.oidc.jwks_endpoint(),
            settings.oidc.issuer.clone(),
            Duration::from_secs(settings.oidc.jwks_ttl),
        );
        let exchanger = TokenExchanger::new(http, &settings.oidc);
        let pkce = PkceManager::new(login_cache);

        Ok(Self {
            config: Arc::new(settings),
            cache: Arc::new(identity_cache),
            permissions,
            catalog: Arc::new(catalog),
            pkce: Arc::new(pkce),
            signer: Arc::new(signer),
            exchanger: Arc::new(exchanger),
            verifier: Arc::new(verifier),
        })
    }

    /// Check all backends this server depends on.
    pub async fn health_check(&self) -> HealthReport {
        HealthReport {
            cache: self.cache.health_check().await.map_err(|err| err.to_string()),
            permissions: self.permissions.health_check().await,
        }
    }

    /// State backed by in-memory caches and an injected permission
    /// store, for tests.
    #[cfg(test)]
    pub fn for_testing(
        settings: Settings,
        permissions: Arc<dyn PermissionStore>,
        catalog: AttributeCatalog,
    ) -> Self {
        use crate::cache::InMemoryCache;

        let identity_cache = Cache::InMemory(InMemoryCache::new(settings.cache.ttl, 16).unwrap());
        let login_cache = Cache::InMemory(InMemoryCache::new(settings.oidc.login_ttl, 16).unwrap());
        Self::assemble(settings, identity_cache, login_cache, permissions, catalog)
            .expect("test state assembly failed")
    }
}

/// Backend check results for the readiness endpoint
pub struct HealthReport {
    pub cache: Result<(), String>,
    pub permissions: Result<(), String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.cache.is_ok() && self.permissions.is_ok()
    }
}

fn create_idp_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(2))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .build()
        .expect("Failed to create identity provider client")
}

fn load_catalog(settings: &Settings) -> Result<AttributeCatalog, StateError> {
    let path = &settings.authz.catalog_file;
    if path.is_empty() {
        return Ok(default_catalog());
    }
    let raw = std::fs::read_to_string(path).map_err(|err| StateError::Catalog {
        path: path.clone(),
        detail: err.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| StateError::Catalog {
        path: path.clone(),
        detail: err.to_string(),
    })
}

/// Demo attribute grants matching the demo resource routes
pub(crate) fn default_catalog() -> AttributeCatalog {
    let mut catalog = AttributeCatalog::new();
    catalog.insert(
        "dashboard",
        vec![AttributeGrant::new("dashboard-1", &["read", "write"])],
    );
    catalog.insert("room", vec![AttributeGrant::new("room-1", &["read"])]);
    catalog
}
