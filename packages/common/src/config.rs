use std::path::PathBuf;

use serde::Deserialize;

/// Which blob store implementation to use.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local directory tree. Default.
    #[default]
    Filesystem,
    /// S3-compatible bucket (AWS S3, Cloudflare R2, MinIO).
    S3,
    /// Process memory; contents vanish on exit.
    Memory,
}

/// Connection settings for the S3 backend.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint, required for R2 and MinIO.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`). Default: false.
    #[serde(default)]
    pub path_style: bool,
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./storage".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,
}

fn default_s3_region() -> String {
    "us-east-1".into()
}
fn default_storage_root() -> PathBuf {
    PathBuf::from("./storage")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            s3: None,
        }
    }
}
