use confique::Config;
use url::Url;

pub mod authz;
pub mod cache;
pub mod oidc;

pub use authz::AuthzConfig;
pub use cache::{CacheConfig, CacheStore, InMemoryConfig, RedisConfig};
pub use oidc::OidcConfig;

/// Application settings, loaded from environment variables
#[derive(Debug, Config, Clone)]
pub struct Settings {
    /// The port the server listens on (default: 7600)
    #[config(env = "WARDEN_PORT", default = 7600)]
    pub port: u16,

    /// Identity provider settings
    #[config(nested)]
    pub oidc: OidcConfig,

    /// Cache settings
    #[config(nested)]
    pub cache: CacheConfig,

    /// Authorization settings
    #[config(nested)]
    pub authz: AuthzConfig,
}

impl Settings {
    /// Load settings from the environment and validate them.
    pub fn new() -> Result<Self, String> {
        let settings = Self::builder()
            .env()
            .load()
            .map_err(|err| format!("Failed to load configuration: {err}"))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.oidc.issuer.is_empty() {
            return Err("WARDEN_OIDC_ISSUER must be set".to_string());
        }
        Url::parse(&self.oidc.issuer)
            .map_err(|err| format!("WARDEN_OIDC_ISSUER is not a valid URL: {err}"))?;
        if self.oidc.client_id.is_empty() {
            return Err("WARDEN_OIDC_CLIENT_ID must be set".to_string());
        }
        if self.oidc.redirect_uri.is_empty() {
            return Err("WARDEN_OIDC_REDIRECT_URI must be set".to_string());
        }
        if self.cache.store_kind() == CacheStore::Redis && self.cache.redis.url.is_empty() {
            return Err("WARDEN_CACHE_REDIS_URL must be set when the redis store is selected".to_string());
        }
        Ok(())
    }

    /// Settings wired against a mock identity provider, for tests.
    #[cfg(test)]
    pub fn for_test_with_mocks(idp_mock: &wiremock::MockServer) -> Self {
        use crate::test_utils::{TEST_CLIENT_ID, TEST_KEY_ID, TEST_PROJECT_ID, TEST_RSA_PRIVATE_KEY_PEM};

        Self {
            port: 0,
            oidc: OidcConfig {
                issuer: idp_mock.uri(),
                client_id: TEST_CLIENT_ID.to_string(),
                redirect_uri: "http://localhost:7600/auth/callback".to_string(),
                frontend_redirect: "http://localhost:3000/app".to_string(),
                post_logout_redirect: "http://localhost:3000/".to_string(),
                project_id: TEST_PROJECT_ID.to_string(),
                scope: "openid profile email".to_string(),
                key_file: String::new(),
                assertion_key: TEST_RSA_PRIVATE_KEY_PEM.to_string(),
                assertion_kid: TEST_KEY_ID.to_string(),
                assertion_ttl: 300,
                login_ttl: 600,
                http_timeout: 5,
                jwks_ttl: 600,
            },
            cache: CacheConfig {
                ttl: 60,
                store: "memory".to_string(),
                memory: InMemoryConfig { capacity_mib: 16 },
                redis: RedisConfig { url: String::new() },
            },
            authz: AuthzConfig {
                permissions_file: String::new(),
                catalog_file: String::new(),
            },
        }
    }
}
