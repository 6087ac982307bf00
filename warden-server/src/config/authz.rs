use confique::Config;

/// Authorization engine configuration
#[derive(Debug, Config, Clone)]
pub struct AuthzConfig {
    /// Path of the role permission JSON document (default: ./permissions.json)
    #[config(env = "WARDEN_AUTHZ_PERMISSIONS_FILE", default = "./permissions.json")]
    pub permissions_file: String,

    /// Path of the attribute grant catalog JSON; empty selects the built-in demo catalog
    #[config(env = "WARDEN_AUTHZ_CATALOG_FILE", default = "")]
    pub catalog_file: String,
}
