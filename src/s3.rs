//! S3-compatible object store sink.

use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream};
use tokio::fs;
use tracing::{debug, info};

use crate::storage::sanitize_filename;
use crate::{FileInfo, StorageError, StorageReceipt, StorageSink};

/// Object store sink configuration.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Bucket name.
    pub bucket: String,
    /// Region.
    pub region: Option<String>,
    /// Custom endpoint (for S3-compatible services).
    pub endpoint: Option<String>,
    /// Explicit access key id. Falls back to ambient credentials when unset.
    pub access_key_id: Option<String>,
    /// Explicit secret access key.
    pub secret_access_key: Option<String>,
    /// Optional session security token.
    pub session_token: Option<String>,
    /// Address the bucket by path instead of virtual host.
    pub force_path_style: bool,
    /// Key prefix under which files are stored.
    pub key_prefix: Option<String>,
    /// Replace existing objects instead of failing.
    pub overwrite: bool,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            force_path_style: false,
            key_prefix: None,
            overwrite: false,
        }
    }
}

impl ObjectStoreConfig {
    /// Create configuration for a bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set a custom endpoint (for S3-compatible services like MinIO).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set explicit credentials.
    pub fn credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Set a session security token.
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Address the bucket by path instead of virtual host.
    pub fn path_style(mut self) -> Self {
        self.force_path_style = true;
        self
    }

    /// Set the key prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the overwrite policy.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// S3-compatible object store sink.
///
/// Follows the same contract as the filesystem sink: the object key is the
/// file's `name_with_extension()` under the configured prefix, and storing
/// fails with `AlreadyExists` when the key is taken and overwrite is off.
/// The existence check and the put are not atomic.
pub struct ObjectStoreSink {
    client: Client,
    config: ObjectStoreConfig,
}

impl ObjectStoreSink {
    /// Create a new object store sink.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self, StorageError> {
        if config.bucket.is_empty() {
            return Err(StorageError::Config("Bucket name is required".to_string()));
        }

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        if let Some(region) = &config.region {
            builder = builder.region(aws_sdk_s3::config::Region::new(region.clone()));
        }
        if let (Some(id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            let credentials = aws_credential_types::Credentials::from_keys(
                id,
                secret,
                config.session_token.clone(),
            );
            builder = builder.credentials_provider(credentials);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, "Initialized object store sink");

        Ok(Self { client, config })
    }

    /// Create from an existing SDK client.
    pub fn from_client(client: Client, config: ObjectStoreConfig) -> Self {
        Self { client, config }
    }

    /// Get the full object key for a file.
    fn object_key(&self, file: &FileInfo) -> String {
        let name = sanitize_filename(&file.name_with_extension());
        if let Some(prefix) = &self.config.key_prefix {
            format!("{}/{}", prefix.trim_end_matches('/'), name)
        } else {
            name
        }
    }

    /// Get the public URL for an object key.
    fn object_url(&self, key: &str) -> String {
        if let Some(endpoint) = &self.config.endpoint {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.config.bucket, key)
        } else if let Some(region) = &self.config.region {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.config.bucket, region, key
            )
        } else {
            format!("https://{}.s3.amazonaws.com/{}", self.config.bucket, key)
        }
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let err_str = e.to_string();
                if err_str.contains("NotFound") || err_str.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(err_str))
                }
            }
        }
    }
}

#[async_trait]
impl StorageSink for ObjectStoreSink {
    async fn store(&self, file: &FileInfo) -> Result<StorageReceipt, StorageError> {
        let key = self.object_key(file);

        if !self.config.overwrite && self.object_exists(&key).await? {
            return Err(StorageError::AlreadyExists { key });
        }

        let data = fs::read(file.tmp_path()).await?;
        let size = data.len() as u64;
        let checksum = file.checksum().await?.to_string();
        let content_type = file.media_type().await?.to_string();

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(&content_type)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        debug!(key = %key, bucket = %self.config.bucket, size = size, "Stored object");

        let url = self.object_url(&key);

        Ok(StorageReceipt::new(key, size)
            .with_content_type(content_type)
            .with_checksum(checksum)
            .with_url(url))
    }
}
