use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod file;
pub mod memory;

pub use file::FilePermissionStore;
pub use memory::MemoryPermissionStore;

/// The persisted permission document.
///
/// `roles` maps a role name to its permission strings
/// (`"<resource>:<action>|<action>"`); `routePermissions` maps a route name
/// to the roles allowed to use it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDocument {
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
    #[serde(default, rename = "routePermissions")]
    pub route_permissions: HashMap<String, Vec<String>>,
}

/// Contract every permission backend must fulfill.
///
/// Lookups for unknown roles or routes return empty lists rather than
/// errors. Mutations replace the role's whole permission list and persist
/// the entire document.
#[async_trait::async_trait]
pub trait PermissionStore: Send + Sync {
    /// Permission strings assigned to a role
    async fn role_permissions(&self, role: &str) -> Result<Vec<String>, StoreError>;

    /// Roles allowed for a named route
    async fn route_permissions(&self, route: &str) -> Result<Vec<String>, StoreError>;

    /// The full route → roles map
    async fn route_map(&self) -> Result<HashMap<String, Vec<String>>, StoreError>;

    /// Insert a role or replace its permission list
    async fn add_role(&self, role: &str, permissions: Vec<String>) -> Result<(), StoreError>;

    /// Remove a role; returns false when the role was absent
    async fn remove_role(&self, role: &str) -> Result<bool, StoreError>;

    /// All known role names, sorted
    async fn list_roles(&self) -> Result<Vec<String>, StoreError>;

    /// Verifies the backend can be read
    async fn health_check(&self) -> Result<(), String>;
}
