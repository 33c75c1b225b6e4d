//! The `curator ingest` command.

mod report;
mod setup;

use clap::{ArgGroup, Args, ValueEnum};
use curator_core::{CategorySelection, Config, Device, IngestRequest, SourceMode};
use std::path::PathBuf;

use report::Reporter;

/// Target device class for the preview width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Desktop,
    Mobile,
}

impl From<DeviceArg> for Device {
    fn from(device: DeviceArg) -> Self {
        match device {
            DeviceArg::Desktop => Device::Desktop,
            DeviceArg::Mobile => Device::Mobile,
        }
    }
}

/// Arguments for the `ingest` command.
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["category", "all_categories"])
))]
pub struct IngestArgs {
    /// Folder of source images (or, with --all-categories, of category folders)
    pub source: PathBuf,

    /// Category every image in SOURCE belongs to
    #[arg(short, long)]
    pub category: Option<String>,

    /// Treat each subfolder of SOURCE as its own category
    #[arg(long)]
    pub all_categories: bool,

    /// Device class the previews are sized for
    #[arg(short, long, value_enum)]
    pub device: DeviceArg,

    /// Items per batch
    #[arg(short, long, default_value = "20")]
    pub batch_size: usize,

    /// Concurrent items within a batch (overrides pipeline.parallel_workers)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Transform only: no uploads, no catalog writes
    #[arg(long)]
    pub dry_run: bool,

    /// Also write derived artifacts to this folder
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of candidates to skip (per category)
    #[arg(long, default_value = "0")]
    pub skip: usize,

    /// Maximum number of candidates to process after --skip (per category)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// SOURCE is an earlier --output-dir category folder with preview/ and download/
    #[arg(long, conflicts_with_all = ["all_categories", "output_dir"])]
    pub from_output: bool,

    /// Catalog database (overrides catalog.path)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Write a JSONL manifest of created records (item reports in dry-run)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl IngestArgs {
    /// The per-run request these arguments describe.
    pub fn to_request(&self) -> IngestRequest {
        let categories = match &self.category {
            Some(category) if !self.all_categories => CategorySelection::Single(category.clone()),
            _ => CategorySelection::All,
        };

        let mut request = IngestRequest::new(&self.source, categories, self.device.into());
        request.batch_size = self.batch_size;
        request.skip = self.skip;
        request.limit = self.limit;
        request.dry_run = self.dry_run;
        request.output_dir = self.output_dir.clone();
        if self.from_output {
            request.mode = SourceMode::Prepared;
        }
        request
    }
}

/// Execute the ingest command.
///
/// Fatal errors (bad arguments, missing source, missing credentials) return
/// before any item is touched. Per-item failures only show up in the summary.
pub async fn execute(args: IngestArgs, config: Config) -> anyhow::Result<()> {
    let request = args.to_request();
    let pipeline = setup::build_pipeline(&args, config)?;

    let total = pipeline.planned_items(&request)?;
    if total == 0 {
        tracing::warn!("No images found in {:?}", request.source);
    }

    let reporter = Reporter::new(total, args.manifest.as_deref(), args.dry_run)?;
    let summary = pipeline.run(&request, reporter.callback()).await?;
    reporter.finish(&summary)?;

    if args.json {
        println!("{}", curator_core::output::summary_json(&summary, true)?);
    }

    if summary.failed > 0 {
        tracing::warn!(
            "{} item(s) failed; re-run the same command to retry them",
            summary.failed
        );
    }

    Ok(())
}
