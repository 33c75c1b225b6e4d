//! Source discovery: find candidate images, order them, apply skip/limit.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::error::ConfigError;

/// Discovers source images under a directory.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
}

/// A candidate source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Just the filename portion
    pub file_name: String,
    /// File size in bytes
    pub size: u64,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Recursively find all supported files under `root`, sorted by path.
    ///
    /// A missing root is fatal for the whole run, not a per-item failure.
    pub fn scan(&self, root: &Path) -> Result<Vec<SourceFile>, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::SourceNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            let entry_path = entry.path();
            if !entry.file_type().is_file() || is_hidden(entry_path) {
                continue;
            }
            if !self.is_supported(entry_path) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => files.push(SourceFile {
                    path: entry_path.to_path_buf(),
                    file_name: entry.file_name().to_string_lossy().into_owned(),
                    size: meta.len(),
                }),
                Err(e) => tracing::warn!("Skipping {:?}: cannot read metadata: {}", entry_path, e),
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Scan, then drop the first `skip` files and cap the rest at `limit`.
    pub fn scan_window(
        &self,
        root: &Path,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<SourceFile>, ConfigError> {
        let files = self.scan(root)?;
        let total = files.len();
        let window = apply_window(files, skip, limit);
        tracing::debug!(
            "Scanned {:?}: {} candidate(s), {} after skip={} limit={:?} ({:.1} MB)",
            root,
            total,
            window.len(),
            skip,
            limit,
            Self::total_size(&window) as f64 / 1_000_000.0
        );
        Ok(window)
    }

    /// Immediate, non-hidden subdirectories of `root`, sorted by name.
    pub fn categories(root: &Path) -> Result<Vec<String>, ConfigError> {
        if !root.is_dir() {
            return Err(ConfigError::SourceNotFound(root.to_path_buf()));
        }

        let entries = std::fs::read_dir(root).map_err(|e| {
            ConfigError::ValidationError(format!("cannot list {}: {e}", root.display()))
        })?;
        let mut categories: Vec<String> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    None
                }
            })
            .filter(|e| e.path().is_dir() && !is_hidden(&e.path()))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        categories.sort();
        Ok(categories)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[SourceFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

/// Skip the first `skip` items, then keep at most `limit`.
pub fn apply_window<T>(items: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

// Dotfiles include macOS `._name.jpg` resource forks, which are never images.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, len: usize) {
        if let Some(parent) = dir.join(name).parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(dir.join(name), vec![0u8; len]).unwrap();
    }

    fn names(files: &[SourceFile]) -> Vec<&str> {
        files.iter().map(|f| f.file_name.as_str()).collect()
    }

    #[test]
    fn test_is_supported() {
        let scanner = Scanner::new(ScanConfig::default());

        assert!(scanner.is_supported(Path::new("test.jpg")));
        assert!(scanner.is_supported(Path::new("test.JPG")));
        assert!(scanner.is_supported(Path::new("test.jpeg")));
        assert!(scanner.is_supported(Path::new("test.png")));
        assert!(scanner.is_supported(Path::new("test.webp")));
        assert!(!scanner.is_supported(Path::new("test.txt")));
        assert!(!scanner.is_supported(Path::new("test")));
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "c.png", 3);
        touch(dir.path(), "a.jpg", 1);
        touch(dir.path(), "b.txt", 1);
        touch(dir.path(), ".hidden.jpg", 1);
        touch(dir.path(), "b.JPEG", 2);

        let files = Scanner::new(ScanConfig::default())
            .scan(dir.path())
            .unwrap();
        assert_eq!(names(&files), vec!["a.jpg", "b.JPEG", "c.png"]);
        assert_eq!(Scanner::total_size(&files), 6);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_broken_links() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ok.jpg", 1);
        std::os::unix::fs::symlink(dir.path().join("gone.jpg"), dir.path().join("dangling.jpg"))
            .unwrap();

        let files = Scanner::new(ScanConfig::default())
            .scan(dir.path())
            .unwrap();
        assert_eq!(names(&files), vec!["ok.jpg"]);
    }

    #[test]
    fn test_scan_recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "nested/deep/z.jpg", 1);
        touch(dir.path(), "a.jpg", 1);

        let files = Scanner::new(ScanConfig::default())
            .scan(dir.path())
            .unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_scan_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scanner::new(ScanConfig::default())
            .scan(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotFound(_)));
    }

    #[test]
    fn test_scan_window_starts_at_skip() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            touch(dir.path(), &format!("img{i:02}.jpg"), 1);
        }
        let scanner = Scanner::new(ScanConfig::default());

        let files = scanner.scan_window(dir.path(), 3, Some(4)).unwrap();
        assert_eq!(
            names(&files),
            vec!["img03.jpg", "img04.jpg", "img05.jpg", "img06.jpg"]
        );

        // min(L, M - S) when the limit runs past the end
        let files = scanner.scan_window(dir.path(), 8, Some(5)).unwrap();
        assert_eq!(names(&files), vec!["img08.jpg", "img09.jpg"]);

        let files = scanner.scan_window(dir.path(), 12, None).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_apply_window_without_limit() {
        assert_eq!(apply_window(vec![1, 2, 3, 4], 1, None), vec![2, 3, 4]);
        assert_eq!(apply_window(vec![1, 2, 3, 4], 0, Some(0)), Vec::<i32>::new());
    }

    #[test]
    fn test_categories_are_sorted_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("space")).unwrap();
        std::fs::create_dir(dir.path().join("abstract")).unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        touch(dir.path(), "loose.jpg", 1);

        let categories = Scanner::categories(dir.path()).unwrap();
        assert_eq!(categories, vec!["abstract", "space"]);
    }
}
