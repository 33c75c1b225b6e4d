//! Image decoding with format detection, dimension limits and orientation.

use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::metadata::MetadataExtractor;

/// Image decoder with configurable limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// Upright pixel data (EXIF orientation already applied)
    pub image: DynamicImage,
    /// Detected source format
    pub format: ImageFormat,
    /// Width in pixels, after orientation
    pub width: u32,
    /// Height in pixels, after orientation
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory image. CPU-bound; callers run this off the async pool.
    pub fn decode(&self, bytes: &[u8], path: &Path) -> Result<DecodedImage, PipelineError> {
        let reader = Self::reader(bytes, path)?;
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };

        // Header-only probe so a decompression bomb is rejected before allocation
        let (width, height) =
            Self::reader(bytes, path)?
                .into_dimensions()
                .map_err(|e| PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
        self.check_dimensions(width, height, path)?;

        let mut image = reader.decode().map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(orientation) = MetadataExtractor::orientation(bytes)
            .and_then(|o| u8::try_from(o).ok())
            .and_then(Orientation::from_exif)
        {
            image.apply_orientation(orientation);
        }

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
        })
    }

    fn reader<'a>(
        bytes: &'a [u8],
        path: &Path,
    ) -> Result<ImageReader<Cursor<&'a [u8]>>, PipelineError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })
    }

    fn check_dimensions(&self, width: u32, height: u32, path: &Path) -> Result<(), PipelineError> {
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        ImageFormat::Avif => "avif".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::WebP), "webp");
    }

    #[test]
    fn test_format_detected_by_content() {
        // PNG bytes behind a .jpg name are still decoded as PNG
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let decoded = decoder
            .decode(&png_bytes(30, 20), Path::new("misnamed.jpg"))
            .unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width, decoded.height), (30, 20));
    }

    #[test]
    fn test_truncated_image_is_decode_error() {
        let mut bytes = png_bytes(64, 64);
        bytes.truncate(40);
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode(&bytes, Path::new("broken.png"))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[test]
    fn test_dimension_limit() {
        let limits = LimitsConfig {
            max_image_dimension: 50,
            ..Default::default()
        };
        let err = ImageDecoder::new(limits)
            .decode(&png_bytes(80, 10), Path::new("wide.png"))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PipelineError::ImageTooLarge { width: 80, .. }
        ));
    }
}
