//! Media storage using Cloudflare R2
//!
//! Handles upload and delete for post and profile images.
//! Files are served via R2 Custom Domain (CDN).

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use base64::Engine;

use crate::config::MediaStorageConfig;
use crate::error::AppError;
use crate::storage::build_r2_http_client;

/// External image store
///
/// `upload` takes a client-supplied payload and returns the reference to
/// persist. `delete` takes a reference previously returned by `upload`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, payload: &str) -> Result<String, AppError>;
    async fn delete(&self, reference: &str) -> Result<(), AppError>;
}

/// Decoded `data:<mime>;base64,<body>` payload
#[derive(Debug, PartialEq)]
pub(crate) struct DataUrl {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub(crate) fn parse(payload: &str) -> Result<Self, AppError> {
        let rest = payload
            .strip_prefix("data:")
            .ok_or_else(|| AppError::Validation("Image must be a data URL".to_string()))?;
        let (meta, body) = rest
            .split_once(',')
            .ok_or_else(|| AppError::Validation("Malformed data URL".to_string()))?;
        let content_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| AppError::Validation("Data URL must be base64 encoded".to_string()))?;
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported media type: {}",
                content_type
            )));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(body.trim())
            .map_err(|e| AppError::Validation(format!("Invalid base64 image data: {}", e)))?;

        Ok(Self {
            content_type: content_type.to_string(),
            bytes,
        })
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

/// Media storage service
///
/// Uploads images to Cloudflare R2 and returns public URLs. Without usable
/// credentials the client is absent and every call fails fast.
pub struct MediaStorage {
    /// S3-compatible client for R2
    client: Option<S3Client>,
    /// Media bucket name
    bucket: String,
    /// Public URL base (Custom Domain)
    /// e.g., "https://media.example.com"
    public_url: String,
}

impl MediaStorage {
    /// Create new media storage client
    ///
    /// Disabled or placeholder configuration yields a store that rejects
    /// every call with `AppError::Storage`.
    pub fn new(config: &MediaStorageConfig) -> Self {
        if !config.is_configured() {
            tracing::info!("Media storage not configured; images will be stored inline");
            return Self::disabled();
        }

        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

        // R2 endpoint: https://{account_id}.r2.cloudflarestorage.com
        let endpoint = format!("https://{}.r2.cloudflarestorage.com", config.account_id);

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "flock-r2",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .http_client(build_r2_http_client())
            .region(Region::new("auto"))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .build();

        tracing::info!(bucket = %config.bucket, "Media storage enabled");

        Self {
            client: Some(S3Client::from_conf(s3_config)),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Store with no backing bucket
    pub fn disabled() -> Self {
        Self {
            client: None,
            bucket: String::new(),
            public_url: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&S3Client, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Storage("Media storage is disabled".to_string()))
    }

    /// Get public URL for an S3 key
    pub fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Map a public URL back to its S3 key, if it lives in this bucket
    fn key_for_reference<'a>(&self, reference: &'a str) -> Option<&'a str> {
        if self.public_url.is_empty() {
            return None;
        }
        reference
            .strip_prefix(self.public_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl MediaStore for MediaStorage {
    /// Upload a data URL payload
    ///
    /// # Returns
    /// Public URL, e.g. `https://media.example.com/images/01H....png`
    async fn upload(&self, payload: &str) -> Result<String, AppError> {
        use aws_sdk_s3::primitives::ByteStream;

        let client = self.client()?;
        let data = DataUrl::parse(payload)?;
        let key = format!("images/{}.{}", ulid::Ulid::new(), data.extension());

        client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.bytes))
            .content_type(&data.content_type)
            .cache_control("public, max-age=31536000") // 1 year
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        tracing::debug!(key = %key, "Uploaded image");
        Ok(self.get_public_url(&key))
    }

    async fn delete(&self, reference: &str) -> Result<(), AppError> {
        let client = self.client()?;
        let key = self.key_for_reference(reference).ok_or_else(|| {
            AppError::Storage(format!("Reference is not managed by this store: {}", reference))
        })?;

        client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;

        tracing::debug!(key = %key, "Deleted image");
        Ok(())
    }
}
