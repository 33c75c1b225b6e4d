//! Curator Core - embeddable media ingestion and cataloging library.
//!
//! Curator walks a directory of source images, derives a preview and a
//! download artifact for each, uploads both to an S3-compatible object store
//! and registers one catalog record per image, keyed by a deterministic slug.
//!
//! # Architecture
//!
//! ```text
//! Scan → dedup check → Transform → Upload ×2 → Catalog insert → Summary
//! ```
//!
//! Runs are resumable without checkpoints: a record only exists once both of
//! its artifacts are uploaded, so re-running skips everything already done.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use curator_core::{CategorySelection, Config, Device, IngestRequest, Pipeline};
//! use curator_core::catalog::SqliteCatalog;
//! use curator_core::storage::S3Store;
//!
//! #[tokio::main]
//! async fn main() -> curator_core::Result<()> {
//!     let config = Config::load()?;
//!     let catalog = Arc::new(SqliteCatalog::open(&config.catalog_path())?);
//!     let store = Arc::new(S3Store::from_config(&config.storage)?);
//!     let pipeline = Pipeline::new(config, catalog, store);
//!
//!     let request = IngestRequest::new(
//!         "./wallpapers/nature",
//!         CategorySelection::Single("nature".into()),
//!         Device::Desktop,
//!     );
//!     let summary = pipeline.run(&request, |item| println!("{}", item.slug)).await?;
//!     println!("{} processed, {} failed", summary.processed, summary.failed);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod catalog;
pub mod config;
pub mod error;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use catalog::{Catalog, SqliteCatalog};
pub use config::Config;
pub use error::{ConfigError, CuratorError, PipelineError, PipelineResult, Result};
pub use output::{ManifestContent, ManifestWriter};
pub use pipeline::{CategorySelection, IngestRequest, Pipeline, SourceMode};
pub use storage::{ObjectStore, S3Store, Uploader};
pub use types::{CatalogRecord, Device, ItemOutcome, ItemReport, RunSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
