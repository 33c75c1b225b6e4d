//! Core data types for the Curator ingestion pipeline.
//!
//! [`CatalogRecord`] is the only type here that outlives a run; everything
//! else describes a single item's trip through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Target device class. Drives preview width and is part of every slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Mobile,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(Device::Desktop),
            "mobile" => Ok(Device::Mobile),
            other => Err(format!("unknown device '{other}' (expected desktop or mobile)")),
        }
    }
}

/// The two derived artifacts produced for every source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Preview,
    Download,
}

impl ArtifactKind {
    /// Directory segment used in storage keys and local output folders.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Preview => "preview",
            ArtifactKind::Download => "download",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transcoded, metadata-free buffer ready for upload.
#[derive(Debug, Clone)]
pub struct DerivedArtifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// MIME type sent as the object's content-type
    pub content_type: &'static str,
    /// File extension without the dot
    pub extension: &'static str,
}

impl DerivedArtifact {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The persisted catalog entry for one source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique natural key; the sole idempotency mechanism
    pub slug: String,

    /// Human-readable title derived from the filename
    pub title: String,

    pub category: String,
    pub device: Device,

    pub preview_url: String,
    pub download_url: String,

    pub width: u32,
    pub height: u32,

    /// Byte size of the download artifact
    pub download_size: u64,

    pub tags: Vec<String>,

    pub preview_key: String,
    pub download_key: String,

    pub original_filename: String,

    /// BLAKE3 of the source bytes
    pub content_hash: String,

    pub created_at: DateTime<Utc>,
}

/// Terminal state of a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Both artifacts uploaded and the record inserted
    Cataloged {
        preview_url: String,
        download_url: String,
        download_size: u64,
    },

    /// Dry-run: transformed, nothing uploaded or inserted
    DryRun {
        width: u32,
        height: u32,
        preview_size: u64,
        download_size: u64,
    },

    /// Slug already present in the catalog (or lost an insert race)
    DuplicateSkip,

    /// Absorbing failure state, with the error rendered for the report
    Failed { error: String },
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

/// What the orchestrator reports for every attempted item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    pub file_name: String,
    pub category: String,
    pub slug: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
    /// Present only when the item produced a new catalog entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<CatalogRecord>,
}

/// Aggregate counts for a run (possibly spanning several categories).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Cataloged items, or transformed items in dry-run
    pub processed: usize,

    /// Items whose slug was already cataloged
    pub skipped: usize,

    /// Items that ended in the failed state
    pub failed: usize,

    /// Categories visited, in processing order
    pub categories: Vec<String>,

    /// Wall-clock time of the run
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    /// Count one finished item.
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Cataloged { .. } | ItemOutcome::DryRun { .. } => self.processed += 1,
            ItemOutcome::DuplicateSkip => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Fold another category's summary into this one.
    pub fn absorb(&mut self, other: RunSummary) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.categories.extend(other.categories);
    }

    pub fn items_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total() as f64 / secs
        } else {
            0.0
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}
