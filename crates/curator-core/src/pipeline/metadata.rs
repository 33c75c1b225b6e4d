//! EXIF orientation lookup.
//!
//! Derived artifacts are re-encoded without any metadata, so the orientation
//! tag has to be baked into the pixels before it is dropped.

use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

/// Reads the handful of EXIF fields the transformer cares about.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// EXIF orientation (1-8) of an in-memory image, if present.
    ///
    /// Lenient: returns `None` for images without EXIF or with a malformed block.
    pub fn orientation(bytes: &[u8]) -> Option<u32> {
        let mut cursor = Cursor::new(bytes);
        let exif = Reader::new().read_from_container(&mut cursor).ok()?;
        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Short(v) => v.first().map(|&x| x as u32),
                Value::Long(v) => v.first().copied(),
                _ => None,
            })
            .filter(|o| (1..=8).contains(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_absent_for_non_exif_bytes() {
        assert!(MetadataExtractor::orientation(b"not an image at all").is_none());
    }

    #[test]
    fn test_orientation_absent_for_plain_png() {
        let img = image::RgbImage::new(4, 4);
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        assert!(MetadataExtractor::orientation(&bytes).is_none());
    }
}
