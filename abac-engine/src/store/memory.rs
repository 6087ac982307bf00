use super::{PermissionDocument, PermissionStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory permission store with the same semantics as the file-backed
/// one. Used by tests and as a seedable default when no file is configured.
#[derive(Default)]
pub struct MemoryPermissionStore {
    document: RwLock<PermissionDocument>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: PermissionDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Snapshot of the current document
    pub async fn document(&self) -> PermissionDocument {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn role_permissions(&self, role: &str) -> Result<Vec<String>, StoreError> {
        let document = self.document.read().await;
        Ok(document.roles.get(role).cloned().unwrap_or_default())
    }

    async fn route_permissions(&self, route: &str) -> Result<Vec<String>, StoreError> {
        let document = self.document.read().await;
        Ok(document
            .route_permissions
            .get(route)
            .cloned()
            .unwrap_or_default())
    }

    async fn route_map(&self) -> Result<HashMap<String, Vec<String>>, StoreError> {
        Ok(self.document.read().await.route_permissions.clone())
    }

    async fn add_role(&self, role: &str, permissions: Vec<String>) -> Result<(), StoreError> {
        let mut document = self.document.write().await;
        document.roles.insert(role.to_string(), permissions);
        Ok(())
    }

    async fn remove_role(&self, role: &str) -> Result<bool, StoreError> {
        let mut document = self.document.write().await;
        Ok(document.roles.remove(role).is_some())
    }

    async fn list_roles(&self) -> Result<Vec<String>, StoreError> {
        let document = self.document.read().await;
        let mut roles: Vec<String> = document.roles.keys().cloned().collect();
        roles.sort();
        Ok(roles)
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}
