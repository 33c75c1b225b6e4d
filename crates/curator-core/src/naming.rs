//! Pure string transforms: slugs, titles, tags, storage keys and URLs.
//!
//! Everything here is deterministic. The same inputs always produce the same
//! slug, which is what makes re-running a partially completed ingest safe.

use std::collections::HashSet;
use std::path::Path;

use crate::types::{ArtifactKind, Device};

/// Hex digits of the BLAKE3 digest used when a name has no usable characters.
const DIGEST_SLUG_LEN: usize = 12;

/// Lowercase ASCII slug: alphanumerics kept, every other run becomes one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Slugify, falling back to a short digest for names like `"!!!"` or `"日本"`.
fn slug_or_digest(text: &str) -> String {
    let slug = slugify(text);
    if !slug.is_empty() {
        return slug;
    }
    let digest = blake3::hash(text.as_bytes()).to_hex();
    digest.as_str()[..DIGEST_SLUG_LEN].to_string()
}

/// File stem of a filename (or path), without the extension.
pub fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

/// Catalog key for one image: `<stem>-<category>-<device>`.
///
/// The extension is deliberately ignored so that a raw source and its
/// prepared artifacts (different extensions, same stem) map to one slug.
pub fn slug_for(filename: &str, category: &str, device: Device) -> String {
    format!(
        "{}-{}-{}",
        slug_or_digest(&file_stem(filename)),
        slug_or_digest(category),
        device.as_str()
    )
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

fn is_numeric(word: &str) -> bool {
    word.chars().all(|c| c.is_ascii_digit())
}

/// Display title: stem words, numbers dropped, each word capitalized.
pub fn title_from_filename(filename: &str) -> String {
    let stem = file_stem(filename);
    let title = words(&stem)
        .filter(|w| !is_numeric(w))
        .map(|w| {
            let lower = w.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

/// Ordered, de-duplicated tag set: filename words, category, device.
pub fn tags_from_filename(filename: &str, category: &str, device: Device) -> Vec<String> {
    let stem = file_stem(filename);
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    let candidates = words(&stem)
        .filter(|w| w.chars().count() >= 3 && !is_numeric(w))
        .map(str::to_lowercase)
        .chain(std::iter::once(slugify(category)))
        .chain(std::iter::once(device.as_str().to_string()));

    for tag in candidates {
        if !tag.is_empty() && seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }

    tags
}

/// Object key: `<collection>/<category>/<kind>/<slug>.<ext>`.
pub fn storage_key(
    collection: &str,
    category: &str,
    kind: ArtifactKind,
    slug: &str,
    extension: &str,
) -> String {
    let collection = collection.trim_matches('/');
    let tail = format!(
        "{}/{}/{}.{}",
        slug_or_digest(category),
        kind.as_str(),
        slug,
        extension
    );
    if collection.is_empty() {
        tail
    } else {
        format!("{collection}/{tail}")
    }
}

/// Public URL for an object; no reachability probe is made.
pub fn public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// MIME type for a file extension, for prepared artifacts read from disk.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Canonical spelling of an image extension (`jpeg` -> `jpg`).
pub fn canonical_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "jpg",
        "png" => "png",
        "webp" => "webp",
        "avif" => "avif",
        "gif" => "gif",
        "tif" | "tiff" => "tiff",
        "bmp" => "bmp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Sunset  Over__The-Sea!"), "sunset-over-the-sea");
        assert_eq!(slugify("--lead and trail--"), "lead-and-trail");
        assert_eq!(slugify("Café 2024"), "caf-2024");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_slug_is_deterministic() {
        let a = slug_for("Mountain Lake.jpg", "Nature", Device::Desktop);
        let b = slug_for("Mountain Lake.jpg", "Nature", Device::Desktop);
        assert_eq!(a, b);
        assert_eq!(a, "mountain-lake-nature-desktop");
    }

    #[test]
    fn test_slug_changes_with_each_argument() {
        let base = slug_for("lake.jpg", "nature", Device::Desktop);
        assert_ne!(base, slug_for("river.jpg", "nature", Device::Desktop));
        assert_ne!(base, slug_for("lake.jpg", "space", Device::Desktop));
        assert_ne!(base, slug_for("lake.jpg", "nature", Device::Mobile));
    }

    #[test]
    fn test_slug_ignores_extension_and_directory() {
        assert_eq!(
            slug_for("lake.png", "nature", Device::Mobile),
            slug_for("/tmp/out/preview/lake.jpg", "nature", Device::Mobile)
        );
    }

    #[test]
    fn test_slug_falls_back_to_digest_for_symbol_names() {
        let slug = slug_for("★★★.jpg", "nature", Device::Desktop);
        let (digest, rest) = slug.split_at(DIGEST_SLUG_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "-nature-desktop");
        assert_ne!(slug, slug_for("☆☆☆.jpg", "nature", Device::Desktop));
    }

    #[test]
    fn test_title_drops_numbers_and_capitalizes() {
        assert_eq!(title_from_filename("sunset_BEACH-01.jpg"), "Sunset Beach");
        assert_eq!(title_from_filename("0001.png"), "Untitled");
    }

    #[test]
    fn test_tags_are_ordered_and_unique() {
        let tags =
            tags_from_filename("dark-forest-at-dark-42.jpg", "Dark Forest", Device::Mobile);
        assert_eq!(tags, vec!["dark", "forest", "dark-forest", "mobile"]);
    }

    #[test]
    fn test_storage_key_layout() {
        let key = storage_key(
            "/wallpapers/",
            "Deep Space",
            ArtifactKind::Preview,
            "nebula-deep-space-desktop",
            "jpg",
        );
        assert_eq!(
            key,
            "wallpapers/deep-space/preview/nebula-deep-space-desktop.jpg"
        );

        let bare = storage_key("", "space", ArtifactKind::Download, "x", "jpg");
        assert_eq!(bare, "space/download/x.jpg");
    }

    #[test]
    fn test_public_url_single_slash() {
        assert_eq!(
            public_url("https://cdn.example.com/", "/a/b.jpg"),
            "https://cdn.example.com/a/b.jpg"
        );
        assert_eq!(
            public_url("https://cdn.example.com", "a/b.jpg"),
            "https://cdn.example.com/a/b.jpg"
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("JPG"), "image/jpeg");
        assert_eq!(content_type_for("webp"), "image/webp");
        assert_eq!(content_type_for("xyz"), "application/octet-stream");
        assert_eq!(canonical_extension("JPEG"), "jpg");
        assert_eq!(canonical_extension("tif"), "tiff");
    }
}
