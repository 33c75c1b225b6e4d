//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, StorageConfig};

/// S3 rejects multipart parts smaller than this (except the last one).
const MIN_PART_SIZE_MB: u64 = 5;

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    ///
    /// Storage fields are only checked for shape here; whether they are
    /// complete enough for a live run is decided by [`StorageConfig::validate_for_upload`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.batch_size must be > 0".into(),
            ));
        }
        if self.pipeline.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.upload_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.upload_timeout_ms must be > 0".into(),
            ));
        }
        if self.transform.desktop_width == 0 || self.transform.mobile_width == 0 {
            return Err(ConfigError::ValidationError(
                "transform.desktop_width and transform.mobile_width must be > 0".into(),
            ));
        }
        for (name, quality) in [
            ("transform.preview_quality", self.transform.preview_quality),
            ("transform.download_quality", self.transform.download_quality),
        ] {
            if !(1..=100).contains(&quality) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 1 and 100"
                )));
            }
        }
        if self.scan.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.supported_formats must not be empty".into(),
            ));
        }
        if self.storage.part_size_mb < MIN_PART_SIZE_MB {
            return Err(ConfigError::ValidationError(format!(
                "storage.part_size_mb must be >= {MIN_PART_SIZE_MB}"
            )));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}

impl StorageConfig {
    /// Check that a live (non dry-run) ingest has everything it needs.
    pub fn validate_for_upload(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket is required outside dry-run".into(),
            ));
        }
        if self.public_base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.public_base_url is required outside dry-run".into(),
            ));
        }
        self.resolve_credentials().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.pipeline.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.pipeline.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.transform.download_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("download_quality"));
    }

    #[test]
    fn test_validate_rejects_small_part_size() {
        let mut config = Config::default();
        config.storage.part_size_mb = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("part_size_mb"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }

    #[test]
    fn test_validate_for_upload_requires_bucket() {
        let storage = StorageConfig::default();
        let err = storage.validate_for_upload().unwrap_err();
        assert!(err.to_string().contains("storage.bucket"));
    }

    #[test]
    fn test_validate_for_upload_requires_public_base() {
        let storage = StorageConfig {
            bucket: "walls".to_string(),
            ..Default::default()
        };
        let err = storage.validate_for_upload().unwrap_err();
        assert!(err.to_string().contains("public_base_url"));
    }
}
