mod error;
mod naming;
mod traits;

pub mod filesystem;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod bucket;

use std::sync::Arc;

use tracing::info;

pub use error::StorageError;
pub use naming::{
    CHECKER_OBJECT, OUTPUT_SUFFIX, TEST_CASE_PREFIX, input_object, output_object,
    problem_namespace,
};
pub use traits::BlobStore;

use crate::config::{StorageBackend, StorageConfig};

/// Build the blob store selected by configuration.
///
/// Called once at startup; the rest of the application only sees the trait object.
pub async fn open_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Filesystem => {
            Arc::new(filesystem::FilesystemBlobStore::new(config.root.clone()).await?)
        }
        StorageBackend::Memory => Arc::new(memory::MemoryBlobStore::new()),
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let s3_config = config.s3.as_ref().ok_or_else(|| {
                StorageError::Config("storage.backend is \"s3\" but [storage.s3] is missing".into())
            })?;
            Arc::new(bucket::S3BlobStore::new(s3_config)?)
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => {
            return Err(StorageError::Config(
                "S3 backend requires the `object-storage` feature".into(),
            ));
        }
    };

    info!(backend = store.backend_name(), "Blob store ready");
    Ok(store)
}
