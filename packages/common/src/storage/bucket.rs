use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::traits::{BlobStore, validate_namespace, validate_segment};
use crate::config::S3StorageConfig;

/// S3-compatible object storage (AWS S3, Cloudflare R2, MinIO).
///
/// Keys are `{namespace}/{name}` inside a single bucket.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
}

impl S3BlobStore {
    pub fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid S3 region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(format!("invalid S3 bucket: {e}")))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }

    fn key(namespace: &str, name: &str) -> Result<String, StorageError> {
        validate_namespace(namespace)?;
        validate_segment(name)?;
        Ok(format!("{namespace}/{name}"))
    }

    async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        validate_namespace(namespace)?;
        let prefix = format!("{namespace}/");
        let pages = self
            .bucket
            .list(prefix, None)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect())
    }
}

fn check_status(key: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {key}"
        ))),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, namespace: &str, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let key = Self::key(namespace, name)?;
        let response = self
            .bucket
            .put_object(&key, data)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(&key, response.status_code())?;
        debug!(key = %key, size = data.len(), "Uploaded object");
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let key = Self::key(namespace, name)?;
        let response = self
            .bucket
            .get_object(&key)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(&key, response.status_code())?;
        Ok(response.bytes().to_vec())
    }

    async fn delete_all(&self, namespace: &str) -> Result<usize, StorageError> {
        let keys = self.list_keys(namespace).await?;
        for key in &keys {
            let response = self
                .bucket
                .delete_object(key)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            check_status(key, response.status_code())?;
        }
        Ok(keys.len())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{namespace}/");
        let mut names: Vec<String> = self
            .list_keys(namespace)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .filter(|name| !name.contains('/'))
            .collect();
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
