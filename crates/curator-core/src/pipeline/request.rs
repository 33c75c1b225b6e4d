//! Per-run ingest options, validated once before any item is touched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{ArtifactKind, Device};

/// Which categories a run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySelection {
    /// The whole source directory is one category
    Single(String),
    /// Every immediate subdirectory of the source is a category
    All,
}

/// Where derived artifacts come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Raw sources, transformed during the run
    #[default]
    Raw,
    /// A previous run's output directory with `preview/` and `download/`
    Prepared,
}

/// Everything one ingest run needs besides the static [`Config`](crate::Config).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub source: PathBuf,
    pub categories: CategorySelection,
    pub device: Device,
    pub batch_size: usize,
    /// Number of scanned candidates to drop (per category)
    pub skip: usize,
    /// Maximum number of candidates to keep after `skip` (per category)
    pub limit: Option<usize>,
    /// Transform only; no uploads, no catalog calls
    pub dry_run: bool,
    /// Also persist derived artifacts under this directory
    pub output_dir: Option<PathBuf>,
    pub mode: SourceMode,
}

impl IngestRequest {
    pub fn new(source: impl Into<PathBuf>, categories: CategorySelection, device: Device) -> Self {
        Self {
            source: source.into(),
            categories,
            device,
            batch_size: 20,
            skip: 0,
            limit: None,
            dry_run: false,
            output_dir: None,
            mode: SourceMode::Raw,
        }
    }

    /// Fatal checks. A request that fails here processes nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch size must be greater than zero".into(),
            ));
        }

        if let CategorySelection::Single(category) = &self.categories {
            if category.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "category must not be empty".into(),
                ));
            }
        }

        if !self.source.is_dir() {
            return Err(ConfigError::SourceNotFound(self.source.clone()));
        }

        if self.mode == SourceMode::Prepared {
            if self.categories == CategorySelection::All {
                return Err(ConfigError::ValidationError(
                    "prepared mode takes a single category".into(),
                ));
            }
            if self.output_dir.is_some() {
                return Err(ConfigError::ValidationError(
                    "output directory is not used in prepared mode".into(),
                ));
            }
            for kind in [ArtifactKind::Preview, ArtifactKind::Download] {
                let dir = self.source.join(kind.as_str());
                if !dir.is_dir() {
                    return Err(ConfigError::SourceNotFound(dir));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn request(source: &Path) -> IngestRequest {
        IngestRequest::new(
            source,
            CategorySelection::Single("nature".to_string()),
            Device::Desktop,
        )
    }

    #[test]
    fn test_defaults() {
        let req = IngestRequest::new("/tmp", CategorySelection::All, Device::Mobile);
        assert_eq!(req.batch_size, 20);
        assert_eq!(req.skip, 0);
        assert!(req.limit.is_none());
        assert!(!req.dry_run);
        assert_eq!(req.mode, SourceMode::Raw);
    }

    #[test]
    fn test_valid_request_passes() {
        let dir = tempdir().unwrap();
        assert!(request(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempdir().unwrap();
        let err = request(&dir.path().join("nope")).validate().unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotFound(_)));
    }

    #[test]
    fn test_blank_category_is_fatal() {
        let dir = tempdir().unwrap();
        let mut req = request(dir.path());
        req.categories = CategorySelection::Single("  ".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_zero_batch_size_is_fatal() {
        let dir = tempdir().unwrap();
        let mut req = request(dir.path());
        req.batch_size = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_prepared_mode_requires_both_folders() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("preview")).unwrap();
        let mut req = request(dir.path());
        req.mode = SourceMode::Prepared;

        let err = req.validate().unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotFound(p) if p.ends_with("download")));

        std::fs::create_dir(dir.path().join("download")).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_prepared_mode_rejects_all_categories() {
        let dir = tempdir().unwrap();
        let mut req = request(dir.path());
        req.mode = SourceMode::Prepared;
        req.categories = CategorySelection::All;
        assert!(req.validate().is_err());
    }
}
