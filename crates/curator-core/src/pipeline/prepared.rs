//! Resume-from-output: artifacts already transcoded by an earlier run.
//!
//! The source holds `preview/` and `download/` folders with matching file
//! stems (exactly the layout written by `output_dir`). Items skip the
//! transformer and go straight to upload and cataloging.

use image::ImageReader;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::naming::{canonical_extension, content_type_for, file_stem};
use crate::types::{ArtifactKind, DerivedArtifact};

use super::scanner::{Scanner, SourceFile};

/// A preview file and its high-resolution counterpart, if one was found.
#[derive(Debug, Clone)]
pub struct PreparedItem {
    pub preview: SourceFile,
    pub download: Option<PathBuf>,
}

/// Both artifacts of a prepared item, read from disk.
#[derive(Debug, Clone)]
pub struct PreparedArtifacts {
    pub preview: DerivedArtifact,
    pub download: DerivedArtifact,
}

impl PreparedItem {
    /// The counterpart path, or the per-item failure for a lone preview.
    pub fn download_path(&self) -> PipelineResult<&Path> {
        self.download
            .as_deref()
            .ok_or_else(|| PipelineError::MissingCounterpart {
                preview: self.preview.path.clone(),
            })
    }

    /// Read both artifacts and probe their dimensions from the headers.
    pub async fn load(&self) -> PipelineResult<PreparedArtifacts> {
        let download_path = self.download_path()?;
        let preview = read_artifact(&self.preview.path, ArtifactKind::Preview).await?;
        let download = read_artifact(download_path, ArtifactKind::Download).await?;
        Ok(PreparedArtifacts { preview, download })
    }
}

/// Pair every preview (windowed by skip/limit) with a same-stem download.
pub fn pair_prepared(
    scanner: &Scanner,
    root: &Path,
    skip: usize,
    limit: Option<usize>,
) -> Result<Vec<PreparedItem>, ConfigError> {
    let previews = scanner.scan_window(&root.join(ArtifactKind::Preview.as_str()), skip, limit)?;
    let downloads: HashMap<String, PathBuf> = scanner
        .scan(&root.join(ArtifactKind::Download.as_str()))?
        .into_iter()
        .map(|f| (file_stem(&f.file_name), f.path))
        .collect();

    let items: Vec<PreparedItem> = previews
        .into_iter()
        .map(|preview| {
            let download = downloads.get(&file_stem(&preview.file_name)).cloned();
            PreparedItem { preview, download }
        })
        .collect();

    let unmatched = items.iter().filter(|i| i.download.is_none()).count();
    if unmatched > 0 {
        tracing::warn!(
            "{} preview(s) in {:?} have no download counterpart",
            unmatched,
            root
        );
    }

    Ok(items)
}

async fn read_artifact(path: &Path, kind: ArtifactKind) -> PipelineResult<DerivedArtifact> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let (width, height) = probe_dimensions(&bytes, path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    Ok(DerivedArtifact {
        kind,
        bytes,
        width,
        height,
        content_type: content_type_for(extension),
        extension: canonical_extension(extension),
    })
}

/// Width and height from the image header, without decoding pixels.
pub fn probe_dimensions(bytes: &[u8], path: &Path) -> PipelineResult<(u32, u32)> {
    let decode_error = |message: String| PipelineError::Decode {
        path: path.to_path_buf(),
        message,
    };
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .into_dimensions()
        .map_err(|e| decode_error(e.to_string()))
}
