//! Run output: JSONL manifests and the JSON run summary.
//!
//! A live run's manifest lists every catalog record it created. A dry run
//! creates no records, so its manifest lists the item reports instead.

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::{ItemReport, RunSummary};

/// What each manifest line holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestContent {
    /// One `CatalogRecord` per newly cataloged item
    Records,
    /// One `ItemReport` per attempted item
    Reports,
}

impl ManifestContent {
    pub fn for_run(dry_run: bool) -> Self {
        if dry_run {
            Self::Reports
        } else {
            Self::Records
        }
    }
}

/// Newline-delimited JSON writer for item results.
pub struct ManifestWriter<W: Write> {
    writer: W,
    content: ManifestContent,
    lines_written: usize,
}

impl ManifestWriter<BufWriter<File>> {
    /// Create (or truncate) a manifest file.
    pub fn create(path: &Path, content: ManifestContent) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?), content))
    }
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(writer: W, content: ManifestContent) -> Self {
        Self {
            writer,
            content,
            lines_written: 0,
        }
    }

    /// Append one item. Returns whether a line was written.
    pub fn write(&mut self, report: &ItemReport) -> io::Result<bool> {
        match self.content {
            ManifestContent::Records => match &report.record {
                Some(record) => self.write_line(record)?,
                None => return Ok(false),
            },
            ManifestContent::Reports => self.write_line(report)?,
        }
        Ok(true)
    }

    fn write_line<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize a run summary to a JSON string.
pub fn summary_json(summary: &RunSummary, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(summary)
    } else {
        serde_json::to_string(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogRecord, Device, ItemOutcome};
    use chrono::Utc;
    use std::time::Duration;

    fn report(slug: &str, outcome: ItemOutcome, with_record: bool) -> ItemReport {
        let record = with_record.then(|| CatalogRecord {
            slug: slug.to_string(),
            title: "Lake".to_string(),
            category: "nature".to_string(),
            device: Device::Mobile,
            preview_url: "https://cdn.example.com/p.jpg".to_string(),
            download_url: "https://cdn.example.com/d.jpg".to_string(),
            width: 1080,
            height: 1920,
            download_size: 2048,
            tags: vec!["lake".to_string()],
            preview_key: "p.jpg".to_string(),
            download_key: "d.jpg".to_string(),
            original_filename: "lake.png".to_string(),
            content_hash: "00".repeat(32),
            created_at: Utc::now(),
        });
        ItemReport {
            file_name: format!("{slug}.png"),
            category: "nature".to_string(),
            slug: slug.to_string(),
            outcome,
            record,
        }
    }

    #[test]
    fn test_records_manifest_only_lists_new_records() {
        let mut writer = ManifestWriter::new(Vec::new(), ManifestContent::Records);
        let cataloged = ItemOutcome::Cataloged {
            preview_url: "https://cdn.example.com/p.jpg".to_string(),
            download_url: "https://cdn.example.com/d.jpg".to_string(),
            download_size: 2048,
        };

        assert!(writer.write(&report("lake", cataloged, true)).unwrap());
        assert!(!writer
            .write(&report("river", ItemOutcome::DuplicateSkip, false))
            .unwrap());
        assert_eq!(writer.lines_written(), 1);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let record: CatalogRecord = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(record.slug, "lake");
        assert_eq!(record.device, Device::Mobile);
    }

    #[test]
    fn test_reports_manifest_lists_every_item() {
        let mut writer = ManifestWriter::new(Vec::new(), ManifestContent::for_run(true));
        let dry = ItemOutcome::DryRun {
            width: 10,
            height: 10,
            preview_size: 100,
            download_size: 200,
        };
        writer.write(&report("a", dry, false)).unwrap();
        writer
            .write(&report(
                "b",
                ItemOutcome::Failed {
                    error: "Decode error".to_string(),
                },
                false,
            ))
            .unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"status\":\"dry_run\""));
        assert!(lines[1].contains("\"status\":\"failed\""));
        assert!(!lines[1].contains("\"record\""));
    }

    #[test]
    fn test_create_makes_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("manifest.jsonl");
        let mut writer = ManifestWriter::create(&path, ManifestContent::Records).unwrap();
        writer.flush().unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_summary_json() {
        let summary = RunSummary {
            processed: 3,
            skipped: 1,
            failed: 0,
            categories: vec!["nature".to_string()],
            elapsed: Duration::from_millis(1500),
        };
        let json = summary_json(&summary, false).unwrap();
        assert!(json.contains("\"processed\":3"));
        assert!(json.contains("\"elapsed\":1.5"));
    }
}
