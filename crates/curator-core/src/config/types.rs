//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::Device;

/// Source discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Recognized source extensions (case-insensitive)
    pub supported_formats: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
                "tiff".to_string(),
                "tif".to_string(),
                "bmp".to_string(),
            ],
        }
    }
}

/// Preview/download encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Preview width for desktop wallpapers
    pub desktop_width: u32,

    /// Preview width for mobile wallpapers
    pub mobile_width: u32,

    /// Lossy quality of the preview (1-100)
    pub preview_quality: u8,

    /// Quality of the full-resolution download (1-100)
    pub download_quality: u8,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            desktop_width: 1280,
            mobile_width: 540,
            preview_quality: 75,
            download_quality: 90,
        }
    }
}

impl TransformConfig {
    /// Preview target width for a device class.
    pub fn preview_width(&self, device: Device) -> u32 {
        match device {
            Device::Desktop => self.desktop_width,
            Device::Mobile => self.mobile_width,
        }
    }
}

/// Batching, concurrency and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items per progress batch
    pub batch_size: usize,

    /// Items processed concurrently within a batch
    pub parallel_workers: usize,

    /// Max retry attempts for transient upload failures (0 = fail fast)
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,

    /// Pause between categories in all-categories mode
    pub category_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            parallel_workers: 4,
            retry_attempts: 2,
            retry_delay_ms: 500,
            category_delay_ms: 0,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum source file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode + transcode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Per-upload timeout in milliseconds
    pub upload_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 16384,
            decode_timeout_ms: 30_000,
            upload_timeout_ms: 120_000,
        }
    }
}

/// S3-compatible object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Target bucket
    pub bucket: String,

    /// Region ("auto" works for R2)
    pub region: String,

    /// Custom endpoint for non-AWS stores (R2, MinIO, LocalStack)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Base that object keys are appended to for public URLs
    pub public_base_url: String,

    /// Top-level key prefix
    pub collection: String,

    /// Multipart part size in megabytes; smaller bodies use a single PUT
    pub part_size_mb: u64,

    /// Cache-Control header set on every object
    pub cache_control: String,

    /// Path-style addressing (required by most non-AWS stores)
    pub force_path_style: bool,

    /// Access key; falls back to AWS_ACCESS_KEY_ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Secret key; falls back to AWS_SECRET_ACCESS_KEY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "auto".to_string(),
            endpoint: None,
            public_base_url: String::new(),
            collection: "wallpapers".to_string(),
            part_size_mb: 8,
            cache_control: "public, max-age=31536000, immutable".to_string(),
            force_path_style: true,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

/// Resolved static credentials for the object store.
#[derive(Clone)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl StorageConfig {
    /// Multipart part size in bytes.
    pub fn part_size_bytes(&self) -> usize {
        (self.part_size_mb as usize) * 1024 * 1024
    }

    /// Resolve credentials from config, then from the standard AWS variables.
    pub fn resolve_credentials(&self) -> Result<StorageCredentials, ConfigError> {
        self.resolve_credentials_with(|name| std::env::var(name).ok())
    }

    pub(crate) fn resolve_credentials_with<F>(
        &self,
        lookup: F,
    ) -> Result<StorageCredentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = self
            .access_key_id
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| lookup("AWS_ACCESS_KEY_ID").filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                ConfigError::MissingCredentials(
                    "set storage.access_key_id or AWS_ACCESS_KEY_ID".into(),
                )
            })?;
        let secret_access_key = self
            .secret_access_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| lookup("AWS_SECRET_ACCESS_KEY").filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                ConfigError::MissingCredentials(
                    "set storage.secret_access_key or AWS_SECRET_ACCESS_KEY".into(),
                )
            })?;
        Ok(StorageCredentials {
            access_key_id,
            secret_access_key,
        })
    }
}

/// Catalog database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.curator/catalog.db"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
