//! Error types for the Curator ingestion pipeline.
//!
//! Errors are split by blast radius: a [`ConfigError`] aborts the whole run
//! before any item is touched, a [`PipelineError`] is scoped to a single item
//! and is absorbed by the orchestrator's item loop.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Curator operations.
#[derive(Error, Debug)]
pub enum CuratorError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal, pre-run errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Object store credentials could not be resolved for a live run
    #[error("Missing object store credentials: {0}")]
    MissingCredentials(String),

    /// Source root does not exist or is not a directory
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),

    /// Catalog database could not be opened
    #[error("Failed to open catalog at {path}: {message}")]
    Catalog { path: PathBuf, message: String },
}

/// Per-item pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source file could not be read
    #[error("Read error for {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Re-encoding a derived artifact failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {target} after {timeout_ms}ms")]
    Timeout {
        target: String,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Object store rejected or failed an upload
    #[error("Upload failed for {key}: {message}")]
    Upload {
        key: String,
        message: String,
        /// Transport failures, throttling and 5xx responses are worth retrying
        retryable: bool,
    },

    /// Catalog lookup or write failed
    #[error("Catalog error for {slug}: {message}")]
    Catalog { slug: String, message: String },

    /// Insert lost a uniqueness race against another run
    #[error("Slug already cataloged: {slug}")]
    Conflict { slug: String },

    /// Prepared preview without a high-resolution counterpart
    #[error("No high-resolution counterpart for {preview}")]
    MissingCounterpart { preview: PathBuf },

    /// Local artifact persistence failed
    #[error("IO error for {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Convenience type alias for Curator results.
pub type Result<T> = std::result::Result<T, CuratorError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
