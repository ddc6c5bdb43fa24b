use async_trait::async_trait;

use super::error::StorageError;

/// Namespaced object storage for test case files.
///
/// A namespace is a `/`-separated path prefix (e.g. `test_cases/42`); names are
/// flat object names inside it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `namespace/name`, replacing any existing object.
    async fn put(&self, namespace: &str, name: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Read an object back.
    async fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete every object in the namespace.
    ///
    /// Returns the number of objects removed. An absent namespace is not an error.
    async fn delete_all(&self, namespace: &str) -> Result<usize, StorageError>;

    /// List object names in the namespace, sorted.
    async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}

/// Reject names that could escape a namespace.
pub(crate) fn validate_segment(segment: &str) -> Result<(), StorageError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains('\0')
    {
        return Err(StorageError::InvalidName(segment.to_string()));
    }
    Ok(())
}

/// Validate every segment of a `/`-separated namespace.
pub(crate) fn validate_namespace(namespace: &str) -> Result<(), StorageError> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidName(namespace.to_string()));
    }
    namespace.split('/').try_for_each(validate_segment)
}
