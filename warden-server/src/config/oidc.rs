use confique::Config;

/// Identity provider configuration for the authorization code flow
#[derive(Debug, Config, Clone)]
pub struct OidcConfig {
    /// Issuer URL of the identity provider, without a trailing slash
    #[config(env = "WARDEN_OIDC_ISSUER", default = "")]
    pub issuer: String,

    /// Client id of the registered OIDC application
    #[config(env = "WARDEN_OIDC_CLIENT_ID", default = "")]
    pub client_id: String,

    /// Redirect URI registered for the authorization code flow
    #[config(env = "WARDEN_OIDC_REDIRECT_URI", default = "")]
    pub redirect_uri: String,

    /// Frontend location that receives the access token after the callback
    #[config(env = "WARDEN_OIDC_FRONTEND_REDIRECT", default = "http://localhost:3000/")]
    pub frontend_redirect: String,

    /// Location the provider sends the browser back to after logout
    #[config(env = "WARDEN_OIDC_POST_LOGOUT_REDIRECT", default = "http://localhost:3000/")]
    pub post_logout_redirect: String,

    /// Provider project whose role grants are honored
    #[config(env = "WARDEN_OIDC_PROJECT_ID", default = "")]
    pub project_id: String,

    /// Scopes requested during login
    #[config(env = "WARDEN_OIDC_SCOPE", default = "openid profile email")]
    pub scope: String,

    /// Path to a provider application key file ({"keyId": ..., "key": ...})
    #[config(env = "WARDEN_OIDC_KEY_FILE", default = "")]
    pub key_file: String,

    /// RSA private key PEM used to sign client assertions, ignored when key_file is set
    #[config(env = "WARDEN_OIDC_ASSERTION_KEY", default = "")]
    pub assertion_key: String,

    /// Key id advertised in client assertion headers, ignored when key_file is set
    #[config(env = "WARDEN_OIDC_ASSERTION_KID", default = "")]
    pub assertion_kid: String,

    /// Client assertion lifetime in seconds (default: 5 minutes)
    #[config(env = "WARDEN_OIDC_ASSERTION_TTL", default = 300)]
    pub assertion_ttl: u64,

    /// How long a pending login may wait for its callback, in seconds (default: 10 minutes)
    #[config(env = "WARDEN_OIDC_LOGIN_TTL", default = 600)]
    pub login_ttl: u64,

    /// Timeout for requests to the identity provider, in seconds (default: 10)
    #[config(env = "WARDEN_OIDC_HTTP_TIMEOUT", default = 10)]
    pub http_timeout: u64,

    /// How long a fetched JWKS document stays fresh, in seconds (default: 10 minutes)
    #[config(env = "WARDEN_OIDC_JWKS_TTL", default = 600)]
    pub jwks_ttl: u64,
}

impl OidcConfig {
    /// Get the provider's authorization endpoint
    pub fn authorize_endpoint(&self) -> String {
        self.endpoint("/oauth/v2/authorize")
    }

    /// Get the provider's token endpoint
    pub fn token_endpoint(&self) -> String {
        self.endpoint("/oauth/v2/token")
    }

    /// Get the provider's userinfo endpoint
    pub fn userinfo_endpoint(&self) -> String {
        self.endpoint("/oidc/v1/userinfo")
    }

    /// Get the provider's JWKS endpoint
    pub fn jwks_endpoint(&self) -> String {
        self.endpoint("/oauth/v2/keys")
    }

    /// Get the provider's RP-initiated logout endpoint
    pub fn end_session_endpoint(&self) -> String {
        self.endpoint("/oidc/v1/end_session")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.issuer.trim_end_matches('/'), path)
    }
}
