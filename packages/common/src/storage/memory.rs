use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::StorageError;
use super::traits::{BlobStore, validate_namespace, validate_segment};

/// In-memory blob store.
///
/// Used for dry runs and tests. Individual object names can be made to fail
/// on `put` to simulate a flaky backend.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    failing_names: RwLock<HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` of `name` (in any namespace) fail.
    pub async fn fail_puts_of(&self, name: &str) {
        self.failing_names.write().await.insert(name.to_string());
    }

    /// Stop injecting failures.
    pub async fn clear_failures(&self) {
        self.failing_names.write().await.clear();
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, namespace: &str, name: &str, data: &[u8]) -> Result<(), StorageError> {
        validate_namespace(namespace)?;
        validate_segment(name)?;

        if self.failing_names.read().await.contains(name) {
            return Err(StorageError::Backend(format!(
                "injected failure for {namespace}/{name}"
            )));
        }

        self.objects
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(namespace)
            .and_then(|objects| objects.get(name))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{namespace}/{name}")))
    }

    async fn delete_all(&self, namespace: &str) -> Result<usize, StorageError> {
        validate_namespace(namespace)?;
        Ok(self
            .objects
            .write()
            .await
            .remove(namespace)
            .map(|objects| objects.len())
            .unwrap_or(0))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .read()
            .await
            .get(namespace)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
