//! Run reporting: progress bar, per-item log lines, manifest and summary table.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use curator_core::pipeline::format_duration;
use curator_core::{ItemOutcome, ItemReport, ManifestContent, ManifestWriter, RunSummary};
use indicatif::{ProgressBar, ProgressStyle};

type SharedManifest = Arc<Mutex<Option<ManifestWriter<BufWriter<File>>>>>;

/// Observes a run through the pipeline's per-item callback.
pub struct Reporter {
    progress: ProgressBar,
    manifest: SharedManifest,
    started: Instant,
}

impl Reporter {
    pub fn new(total: usize, manifest: Option<&Path>, dry_run: bool) -> anyhow::Result<Self> {
        let manifest = match manifest {
            Some(path) => {
                tracing::info!("Writing manifest to {:?}", path);
                Some(ManifestWriter::create(path, ManifestContent::for_run(dry_run))?)
            }
            None => None,
        };

        Ok(Self {
            progress: create_progress_bar(total as u64),
            manifest: Arc::new(Mutex::new(manifest)),
            started: Instant::now(),
        })
    }

    /// Callback handed to `Pipeline::run`.
    pub fn callback(&self) -> impl Fn(&ItemReport) + Send + Sync + 'static {
        let progress = self.progress.clone();
        let manifest = Arc::clone(&self.manifest);
        let started = self.started;

        move |report: &ItemReport| {
            progress.suspend(|| log_item(report));

            if let Some(writer) = manifest
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_mut()
            {
                if let Err(e) = writer.write(report) {
                    tracing::error!("Failed to write manifest line for {}: {e}", report.slug);
                }
            }

            progress.inc(1);
            progress.set_message(rate_message(progress.position(), started));
        }
    }

    /// Close the progress bar, flush the manifest and print the summary table.
    pub fn finish(self, summary: &RunSummary) -> anyhow::Result<()> {
        self.progress.finish_and_clear();

        let mut manifest = self.manifest.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(writer) = manifest.as_mut() {
            writer.flush()?;
            tracing::info!("Manifest: {} line(s) written", writer.lines_written());
        }

        print_summary(summary);
        Ok(())
    }
}

fn log_item(report: &ItemReport) {
    match &report.outcome {
        ItemOutcome::Cataloged { download_size, .. } => tracing::info!(
            "Cataloged {} as {} ({:.1} MB)",
            report.file_name,
            report.slug,
            *download_size as f64 / 1_000_000.0
        ),
        ItemOutcome::DryRun { width, height, .. } => tracing::info!(
            "[dry run] {} -> {} ({width}x{height})",
            report.file_name,
            report.slug
        ),
        ItemOutcome::DuplicateSkip => {
            tracing::debug!("Skipped {}: {} already cataloged", report.file_name, report.slug)
        }
        // The pipeline already logs the failure with its cause.
        ItemOutcome::Failed { .. } => {}
    }
}

fn rate_message(done: u64, started: Instant) -> String {
    let elapsed = started.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        format!("{:.1} img/sec", done as f64 / elapsed)
    } else {
        String::new()
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%, ETA {eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Render the summary table printed to stderr after a run.
fn summary_table(summary: &RunSummary) -> String {
    let mut lines = vec![
        String::new(),
        "  ====================================".to_string(),
        "               Summary".to_string(),
        "  ====================================".to_string(),
        format!("    Processed:    {:>8}", summary.processed),
    ];
    if summary.skipped > 0 {
        lines.push(format!("    Skipped:      {:>8}", summary.skipped));
    }
    if summary.failed > 0 {
        lines.push(format!("    Failed:       {:>8}", summary.failed));
    }
    lines.push("  ------------------------------------".to_string());
    lines.push(format!("    Total:        {:>8}", summary.total()));
    if summary.categories.len() > 1 {
        lines.push(format!("    Categories:   {:>8}", summary.categories.len()));
    }
    lines.push(format!(
        "    Duration:     {:>8}",
        format_duration(summary.elapsed)
    ));
    lines.push(format!(
        "    Rate:         {:>7.1} img/sec",
        summary.items_per_second()
    ));
    lines.push("  ====================================".to_string());
    lines.join("\n")
}

fn print_summary(summary: &RunSummary) {
    eprintln!("{}", summary_table(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn failed(slug: &str) -> ItemReport {
        ItemReport {
            file_name: format!("{slug}.jpg"),
            category: "nature".to_string(),
            slug: slug.to_string(),
            outcome: ItemOutcome::Failed {
                error: "Decode error".to_string(),
            },
            record: None,
        }
    }

    #[test]
    fn test_summary_table_hides_zero_rows() {
        let summary = RunSummary {
            processed: 12,
            skipped: 0,
            failed: 2,
            categories: vec!["nature".to_string()],
            elapsed: Duration::from_secs(65),
        };
        let table = summary_table(&summary);
        assert!(table.contains("Processed:"));
        assert!(table.contains("Failed:"));
        assert!(!table.contains("Skipped:"));
        assert!(!table.contains("Categories:"));
        assert!(table.contains("1m 05s"));
    }

    #[test]
    fn test_callback_writes_dry_run_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.jsonl");
        let reporter = Reporter::new(2, Some(&path), true).unwrap();
        let callback = reporter.callback();

        callback(&failed("a"));
        callback(&failed("b"));
        reporter.finish(&RunSummary::default()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"slug\":\"a\""));
    }

    #[test]
    fn test_live_manifest_skips_items_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        let reporter = Reporter::new(1, Some(&path), false).unwrap();

        (reporter.callback())(&failed("a"));
        reporter.finish(&RunSummary::default()).unwrap();

        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }
}
