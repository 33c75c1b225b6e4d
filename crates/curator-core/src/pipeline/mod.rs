//! Ingestion pipeline components.
//!
//! Stages, leaf first:
//! - **scanner**: Find, order and window candidate files
//! - **validate**: Size and magic-byte checks before decoding
//! - **metadata**: EXIF orientation
//! - **decode**: Format detection, dimension limits, upright pixels
//! - **hash**: Content hash for catalog records
//! - **transform**: Preview and download artifacts
//! - **prepared**: Resume from an earlier run's output
//! - **progress**: Throughput and ETA
//! - **request**: Per-run options
//! - **orchestrator**: Drives a whole run

pub mod decode;
pub mod hash;
pub mod metadata;
pub mod orchestrator;
pub mod prepared;
pub mod progress;
pub mod request;
pub mod scanner;
pub mod transform;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use hash::Hasher;
pub use metadata::MetadataExtractor;
pub use orchestrator::{ItemCallback, Pipeline};
pub use prepared::{pair_prepared, PreparedItem};
pub use progress::{eta, format_duration, BatchProgress};
pub use request::{CategorySelection, IngestRequest, SourceMode};
pub use scanner::{Scanner, SourceFile};
pub use transform::{preview_dimensions, TransformOutput, Transformer};
pub use validate::Validator;
