use super::{PermissionDocument, PermissionStore};
use crate::error::StoreError;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Permission store persisted as a single JSON document on disk.
///
/// Every read parses the file fresh, so edits made out-of-band are picked up
/// on the next lookup. Every mutation reads, modifies, and rewrites the whole
/// document under an in-process lock; the last writer wins. A missing file
/// behaves as an empty document and is created on the first mutation.
pub struct FilePermissionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePermissionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<PermissionDocument, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(PermissionDocument::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn write_document(&self, document: &PermissionDocument) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for FilePermissionStore {
    async fn role_permissions(&self, role: &str) -> Result<Vec<String>, StoreError> {
        let document = self.read_document().await?;
        Ok(document.roles.get(role).cloned().unwrap_or_default())
    }

    async fn route_permissions(&self, route: &str) -> Result<Vec<String>, StoreError> {
        let document = self.read_document().await?;
        Ok(document
            .route_permissions
            .get(route)
            .cloned()
            .unwrap_or_default())
    }

    async fn route_map(&self) -> Result<HashMap<String, Vec<String>>, StoreError> {
        let document = self.read_document().await?;
        Ok(document.route_permissions)
    }

    async fn add_role(&self, role: &str, permissions: Vec<String>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.roles.insert(role.to_string(), permissions);
        self.write_document(&document).await?;
        debug!("Stored role '{}' in {}", role, self.path.display());
        Ok(())
    }

    async fn remove_role(&self, role: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        let removed = document.roles.remove(role).is_some();
        if removed {
            self.write_document(&document).await?;
            debug!("Removed role '{}' from {}", role, self.path.display());
        }
        Ok(removed)
    }

    async fn list_roles(&self) -> Result<Vec<String>, StoreError> {
        let document = self.read_document().await?;
        let mut roles: Vec<String> = document.roles.into_keys().collect();
        roles.sort();
        Ok(roles)
    }

    async fn health_check(&self) -> Result<(), String> {
        self.read_document()
            .await
            .map(|_| ())
            .map_err(|err| format!("Permission file check failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FilePermissionStore {
        FilePermissionStore::new(dir.path().join("permissions.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert!(store.role_permissions("admin").await.unwrap().is_empty());
        assert!(store.route_permissions("/dashboard").await.unwrap().is_empty());
        assert!(store.list_roles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_remove_role_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .add_role("editor", vec!["dashboard:read|write".to_string()])
            .await
            .unwrap();
        assert_eq!(
            store.role_permissions("editor").await.unwrap(),
            vec!["dashboard:read|write"]
        );

        // The document on disk is the full replacement, not a patch
        let raw = tokio::fs::read_to_string(store.path()).await.unwrap();
        let document: PermissionDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(document.roles.len(), 1);

        assert!(store.remove_role("editor").await.unwrap());
        assert!(!store.remove_role("editor").await.unwrap());
        assert!(store.role_permissions("editor").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_role_replaces_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store
            .add_role("viewer", vec!["report:read".to_string()])
            .await
            .unwrap();
        store
            .add_role("viewer", vec!["dashboard:read".to_string()])
            .await
            .unwrap();

        assert_eq!(
            store.role_permissions("viewer").await.unwrap(),
            vec!["dashboard:read"]
        );
    }

    #[tokio::test]
    async fn test_mutation_preserves_route_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        tokio::fs::write(
            &path,
            serde_json::json!({
                "roles": {"admin": ["dashboard:read|write"]},
                "routePermissions": {"/dashboard": ["admin"]},
            })
            .to_string(),
        )
        .await
        .unwrap();

        let store = FilePermissionStore::new(&path);
        store
            .add_role("viewer", vec!["dashboard:read".to_string()])
            .await
            .unwrap();

        assert_eq!(
            store.route_permissions("/dashboard").await.unwrap(),
            vec!["admin"]
        );
        let mut roles = store.list_roles().await.unwrap();
        roles.sort();
        assert_eq!(roles, vec!["admin", "viewer"]);
    }

    #[tokio::test]
    async fn test_malformed_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permissions.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FilePermissionStore::new(&path);
        assert!(matches!(
            store.role_permissions("admin").await,
            Err(StoreError::Malformed(_))
        ));
        assert!(store.health_check().await.is_err());
    }
}
