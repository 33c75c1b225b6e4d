//! Derived artifact generation: a resized preview and a full-size download.
//!
//! Both artifacts are re-encoded from decoded pixels, so no EXIF, ICC or XMP
//! block from the source survives into the uploaded objects.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::{Config, LimitsConfig, TransformConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ArtifactKind, DerivedArtifact, Device};

use super::decode::{format_to_string, ImageDecoder};
use super::validate::Validator;

const JPEG_CONTENT_TYPE: &str = "image/jpeg";
const JPEG_EXTENSION: &str = "jpg";

/// Produces preview and download buffers from raw source bytes.
#[derive(Debug, Clone)]
pub struct Transformer {
    validator: Validator,
    decoder: ImageDecoder,
    config: TransformConfig,
    limits: LimitsConfig,
}

/// Both derived artifacts plus the upright source dimensions.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub preview: DerivedArtifact,
    pub download: DerivedArtifact,
    pub source_width: u32,
    pub source_height: u32,
    /// Detected source format ("jpeg", "png", ...)
    pub source_format: String,
}

/// Fit `width x height` inside `target_width`, never enlarging.
pub fn preview_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width <= target_width {
        return (width, height);
    }
    let scaled = (height as f64 * target_width as f64 / width as f64).round() as u32;
    (target_width, scaled.max(1))
}

impl Transformer {
    pub fn new(config: &Config) -> Self {
        Self {
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            config: config.transform.clone(),
            limits: config.limits.clone(),
        }
    }

    /// Validate, decode and re-encode one source image.
    ///
    /// Pure CPU work with no shared state; a failure only concerns this item.
    pub fn transform(
        &self,
        bytes: &[u8],
        path: &Path,
        device: Device,
    ) -> PipelineResult<TransformOutput> {
        self.validator.validate(bytes, path)?;
        let decoded = self.decoder.decode(bytes, path)?;
        let (width, height) = (decoded.width, decoded.height);

        let target = self.config.preview_width(device);
        let (preview_width, preview_height) = preview_dimensions(width, height, target);

        let preview_bytes = if (preview_width, preview_height) == (width, height) {
            encode_jpeg(&decoded.image, self.config.preview_quality, path)?
        } else {
            let resized =
                decoded
                    .image
                    .resize_exact(preview_width, preview_height, FilterType::Lanczos3);
            encode_jpeg(&resized, self.config.preview_quality, path)?
        };

        let download_bytes = encode_jpeg(&decoded.image, self.config.download_quality, path)?;

        tracing::trace!(
            "  Transform {:?}: {}x{} -> preview {}x{} ({} B), download {} B",
            path,
            width,
            height,
            preview_width,
            preview_height,
            preview_bytes.len(),
            download_bytes.len()
        );

        Ok(TransformOutput {
            preview: DerivedArtifact {
                kind: ArtifactKind::Preview,
                bytes: preview_bytes,
                width: preview_width,
                height: preview_height,
                content_type: JPEG_CONTENT_TYPE,
                extension: JPEG_EXTENSION,
            },
            download: DerivedArtifact {
                kind: ArtifactKind::Download,
                bytes: download_bytes,
                width,
                height,
                content_type: JPEG_CONTENT_TYPE,
                extension: JPEG_EXTENSION,
            },
            source_width: width,
            source_height: height,
            source_format: format_to_string(decoded.format),
        })
    }

    /// Run [`transform`](Self::transform) on the blocking pool with a timeout.
    pub async fn transform_blocking(
        &self,
        bytes: Vec<u8>,
        path: PathBuf,
        device: Device,
    ) -> PipelineResult<TransformOutput> {
        let this = self.clone();
        let task_path = path.clone();
        let timeout_ms = self.limits.decode_timeout_ms;

        let task =
            tokio::task::spawn_blocking(move || this.transform(&bytes, &task_path, device));

        match timeout(Duration::from_millis(timeout_ms), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Decode {
                path,
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                target: path.display().to_string(),
                stage: "transform".to_string(),
                timeout_ms,
            }),
        }
    }
}

/// Encode as baseline JPEG; alpha is dropped since JPEG has no alpha channel.
fn encode_jpeg(image: &DynamicImage, quality: u8, path: &Path) -> PipelineResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .map_err(|e| PipelineError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(bytes)
}
