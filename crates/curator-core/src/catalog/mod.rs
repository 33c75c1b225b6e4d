//! Catalog seam: duplicate detection and record registration by slug.

pub mod sqlite;

pub use sqlite::SqliteCatalog;

use async_trait::async_trait;

use crate::error::PipelineResult;
use crate::types::CatalogRecord;

/// The catalog access pattern the pipeline relies on.
///
/// `slug` is unique across the catalog. `insert` must fail with
/// [`PipelineError::Conflict`](crate::error::PipelineError::Conflict) when
/// the slug is already present, so concurrent runs can lose a race safely.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Point lookup on the unique key.
    async fn exists(&self, slug: &str) -> PipelineResult<bool>;

    /// Create exactly one record.
    async fn insert(&self, record: &CatalogRecord) -> PipelineResult<()>;
}
