//! Pipeline orchestration: wires the stages together for a whole run.
//!
//! Every item goes through dedup check, transform, upload and catalog insert.
//! An error inside one item ends as [`ItemOutcome::Failed`] for that item
//! only. [`ConfigError`]s abort the run, and all of them are raised while
//! planning, before the first item starts.

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::naming::{file_stem, slug_for, storage_key, tags_from_filename, title_from_filename};
use crate::storage::{ObjectStore, Uploader};
use crate::types::{CatalogRecord, DerivedArtifact, Device, ItemOutcome, ItemReport, RunSummary};

use super::hash::Hasher;
use super::prepared::{pair_prepared, PreparedItem};
use super::progress::BatchProgress;
use super::request::{CategorySelection, IngestRequest, SourceMode};
use super::scanner::{Scanner, SourceFile};
use super::transform::Transformer;

/// Callback invoked once per finished item, in completion order.
pub type ItemCallback = Arc<dyn Fn(&ItemReport) + Send + Sync>;

/// Terminal outcome plus the record it created, if any.
type Ingested = (ItemOutcome, Option<CatalogRecord>);

/// Catalog and uploader; absent for a dry-run-only pipeline.
#[derive(Clone)]
struct Sinks {
    catalog: Arc<dyn Catalog>,
    uploader: Uploader,
}

#[derive(Debug, Clone)]
enum WorkItem {
    Raw(SourceFile),
    Prepared(PreparedItem),
    /// A candidate whose slug an earlier candidate of the same run claimed
    Shadowed { file_name: String, first: String },
}

impl WorkItem {
    fn file_name(&self) -> &str {
        match self {
            WorkItem::Raw(file) => &file.file_name,
            WorkItem::Prepared(item) => &item.preview.file_name,
            WorkItem::Shadowed { file_name, .. } => file_name,
        }
    }
}

type Plan = Vec<(String, Vec<WorkItem>)>;

/// Settings shared by every item of one category.
struct ItemContext {
    category: String,
    device: Device,
    dry_run: bool,
    output_dir: Option<PathBuf>,
}

struct Inner {
    config: Config,
    scanner: Scanner,
    transformer: Transformer,
    sinks: Option<Sinks>,
}

/// The ingest pipeline. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    /// A pipeline able to run live: uploads go to `store`, records to `catalog`.
    pub fn new(config: Config, catalog: Arc<dyn Catalog>, store: Arc<dyn ObjectStore>) -> Self {
        let uploader = Uploader::new(store, &config);
        Self::build(config, Some(Sinks { catalog, uploader }))
    }

    /// A pipeline that can only serve dry-run requests.
    pub fn dry_run_only(config: Config) -> Self {
        Self::build(config, None)
    }

    fn build(config: Config, sinks: Option<Sinks>) -> Self {
        Self {
            inner: Arc::new(Inner {
                scanner: Scanner::new(config.scan.clone()),
                transformer: Transformer::new(&config),
                sinks,
                config,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Run one ingest request to completion.
    ///
    /// `on_item` sees every attempted item once. Per-item failures are
    /// counted in the returned summary, never returned as errors.
    pub async fn run<F>(&self, request: &IngestRequest, on_item: F) -> Result<RunSummary, ConfigError>
    where
        F: Fn(&ItemReport) + Send + Sync + 'static,
    {
        self.inner.config.validate()?;
        request.validate()?;
        if !request.dry_run && self.inner.sinks.is_none() {
            return Err(ConfigError::ValidationError(
                "a live run needs an object store and a catalog".into(),
            ));
        }

        let plan = self.plan(request)?;
        let total: usize = plan.iter().map(|(_, items)| items.len()).sum();
        tracing::info!(
            "Ingesting {} item(s) from {:?} across {} category(ies){}",
            total,
            request.source,
            plan.len(),
            if request.dry_run { " [dry run]" } else { "" }
        );

        let on_item: ItemCallback = Arc::new(on_item);
        let delay = Duration::from_millis(self.inner.config.pipeline.category_delay_ms);
        let started = Instant::now();
        let mut summary = RunSummary::default();

        for (index, (category, items)) in plan.into_iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tracing::debug!("Pausing {delay:?} before category {category}");
                tokio::time::sleep(delay).await;
            }

            let context = Arc::new(ItemContext {
                category,
                device: request.device,
                dry_run: request.dry_run,
                output_dir: request.output_dir.clone(),
            });
            let category_summary = self
                .process_category(items, context, request.batch_size, &on_item)
                .await;
            summary.absorb(category_summary);
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            "Run complete: {} processed, {} skipped, {} failed in {:.1}s",
            summary.processed,
            summary.skipped,
            summary.failed,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Number of items `run` would attempt for this request.
    pub fn planned_items(&self, request: &IngestRequest) -> Result<usize, ConfigError> {
        self.inner.config.validate()?;
        request.validate()?;
        Ok(self
            .plan(request)?
            .iter()
            .map(|(_, items)| items.len())
            .sum())
    }

    /// Resolve categories and candidate lists for the whole run.
    ///
    /// Every slug is claimed by exactly one candidate, the first in scan
    /// order, so no two items of a run write the same storage keys.
    fn plan(&self, request: &IngestRequest) -> Result<Plan, ConfigError> {
        let mut plan = self.scan_plan(request)?;
        shadow_duplicate_slugs(&mut plan, request.device);
        Ok(plan)
    }

    fn scan_plan(&self, request: &IngestRequest) -> Result<Plan, ConfigError> {
        let scanner = &self.inner.scanner;
        let (skip, limit) = (request.skip, request.limit);

        match (request.mode, &request.categories) {
            (SourceMode::Raw, CategorySelection::Single(category)) => {
                let files = scanner.scan_window(&request.source, skip, limit)?;
                Ok(vec![(
                    category.clone(),
                    files.into_iter().map(WorkItem::Raw).collect(),
                )])
            }
            (SourceMode::Raw, CategorySelection::All) => {
                let categories = Scanner::categories(&request.source)?;
                if categories.is_empty() {
                    tracing::warn!("No category folders under {:?}", request.source);
                }
                categories
                    .into_iter()
                    .map(|category| -> Result<(String, Vec<WorkItem>), ConfigError> {
                        let files =
                            scanner.scan_window(&request.source.join(&category), skip, limit)?;
                        Ok((category, files.into_iter().map(WorkItem::Raw).collect()))
                    })
                    .collect()
            }
            (SourceMode::Prepared, CategorySelection::Single(category)) => {
                let items = pair_prepared(scanner, &request.source, skip, limit)?;
                Ok(vec![(
                    category.clone(),
                    items.into_iter().map(WorkItem::Prepared).collect(),
                )])
            }
            (SourceMode::Prepared, CategorySelection::All) => Err(ConfigError::ValidationError(
                "prepared mode takes a single category".into(),
            )),
        }
    }

    /// Process one category's candidates in fixed-size batches.
    ///
    /// Within a batch, items run concurrently up to `parallel_workers`.
    /// Batches only bound memory and pace progress reporting.
    async fn process_category(
        &self,
        items: Vec<WorkItem>,
        context: Arc<ItemContext>,
        batch_size: usize,
        on_item: &ItemCallback,
    ) -> RunSummary {
        let mut summary = RunSummary {
            categories: vec![context.category.clone()],
            ..RunSummary::default()
        };
        let started = Instant::now();
        let mut progress = BatchProgress::new(items.len());
        let batches = items.len().div_ceil(batch_size);
        let workers = self.inner.config.pipeline.parallel_workers;

        for (index, batch) in items.chunks(batch_size).enumerate() {
            let semaphore = Arc::new(Semaphore::new(workers));
            let mut handles = Vec::with_capacity(batch.len());

            for item in batch {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!("Worker semaphore closed unexpectedly, stopping batch");
                        break;
                    }
                };

                let inner = Arc::clone(&self.inner);
                let context = Arc::clone(&context);
                let on_item = Arc::clone(on_item);
                let item = item.clone();

                handles.push(tokio::spawn(async move {
                    let report = inner.process_item(item, &context).await;
                    drop(permit);
                    on_item(&report);
                    report.outcome
                }));
            }

            for handle in handles {
                match handle.await {
                    Ok(outcome) => summary.record(&outcome),
                    Err(e) => {
                        tracing::error!("Item task panicked: {e}");
                        summary.failed += 1;
                    }
                }
            }

            progress.advance(batch.len());
            tracing::info!(
                "[{}] batch {}/{}: {}",
                context.category,
                index + 1,
                batches,
                progress.status_line()
            );
        }

        summary.elapsed = started.elapsed();
        summary
    }
}

impl Inner {
    async fn process_item(&self, item: WorkItem, context: &ItemContext) -> ItemReport {
        let file_name = item.file_name().to_string();
        let slug = slug_for(&file_name, &context.category, context.device);
        let start = Instant::now();

        let result = match &item {
            WorkItem::Raw(file) => self.ingest_raw(file, &slug, context).await,
            WorkItem::Prepared(prepared) => self.ingest_prepared(prepared, &slug, context).await,
            WorkItem::Shadowed { first, .. } => {
                tracing::debug!("Skipped {file_name}: {slug} is taken by {first} in this run");
                Ok((ItemOutcome::DuplicateSkip, None))
            }
        };

        let (outcome, record) = match result {
            Ok(ingested) => ingested,
            Err(e) => {
                tracing::warn!("Failed {}: {}", file_name, e);
                (ItemOutcome::Failed { error: e.to_string() }, None)
            }
        };

        match &outcome {
            ItemOutcome::Cataloged { .. } => {
                tracing::debug!("Cataloged {file_name} as {slug} in {:?}", start.elapsed())
            }
            ItemOutcome::DryRun { width, height, .. } => {
                tracing::debug!("Dry run {file_name}: {width}x{height} as {slug}")
            }
            ItemOutcome::DuplicateSkip => {
                tracing::debug!("Skipped {file_name}: {slug} already cataloged")
            }
            ItemOutcome::Failed { .. } => {}
        }

        ItemReport {
            file_name,
            category: context.category.clone(),
            slug,
            outcome,
            record,
        }
    }

    async fn ingest_raw(
        &self,
        file: &SourceFile,
        slug: &str,
        context: &ItemContext,
    ) -> PipelineResult<Ingested> {
        if self.already_cataloged(slug, context).await? {
            return Ok((ItemOutcome::DuplicateSkip, None));
        }

        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| PipelineError::Read {
                path: file.path.clone(),
                message: e.to_string(),
            })?;
        let content_hash = Hasher::content_hash(&bytes);

        let output = self
            .transformer
            .transform_blocking(bytes, file.path.clone(), context.device)
            .await?;
        tracing::debug!(
            "Transformed {} ({} {}x{}): preview {} B, download {} B",
            file.file_name,
            output.source_format,
            output.source_width,
            output.source_height,
            output.preview.size(),
            output.download.size()
        );

        if let Some(output_dir) = &context.output_dir {
            persist_locally(
                output_dir,
                &context.category,
                &file.file_name,
                [&output.preview, &output.download],
            )
            .await?;
        }

        self.publish(
            &file.file_name,
            slug,
            content_hash,
            output.preview,
            output.download,
            context,
        )
        .await
    }

    async fn ingest_prepared(
        &self,
        item: &PreparedItem,
        slug: &str,
        context: &ItemContext,
    ) -> PipelineResult<Ingested> {
        item.download_path()?;
        if self.already_cataloged(slug, context).await? {
            return Ok((ItemOutcome::DuplicateSkip, None));
        }

        let artifacts = item.load().await?;
        let content_hash = Hasher::content_hash(&artifacts.download.bytes);

        self.publish(
            &item.preview.file_name,
            slug,
            content_hash,
            artifacts.preview,
            artifacts.download,
            context,
        )
        .await
    }

    /// Dry runs never touch the catalog.
    async fn already_cataloged(&self, slug: &str, context: &ItemContext) -> PipelineResult<bool> {
        if context.dry_run {
            return Ok(false);
        }
        self.sinks(slug)?.catalog.exists(slug).await
    }

    fn sinks(&self, slug: &str) -> PipelineResult<&Sinks> {
        self.sinks.as_ref().ok_or_else(|| PipelineError::Catalog {
            slug: slug.to_string(),
            message: "no catalog configured".to_string(),
        })
    }

    /// Upload both artifacts, then insert the record.
    ///
    /// The record is only built once both uploads have succeeded.
    async fn publish(
        &self,
        file_name: &str,
        slug: &str,
        content_hash: String,
        preview: DerivedArtifact,
        download: DerivedArtifact,
        context: &ItemContext,
    ) -> PipelineResult<Ingested> {
        let (width, height, download_size) = (download.width, download.height, download.size());

        if context.dry_run {
            return Ok((
                ItemOutcome::DryRun {
                    width,
                    height,
                    preview_size: preview.size(),
                    download_size,
                },
                None,
            ));
        }

        let sinks = self.sinks(slug)?;
        let collection = &self.config.storage.collection;
        let preview_key = storage_key(
            collection,
            &context.category,
            preview.kind,
            slug,
            preview.extension,
        );
        let download_key = storage_key(
            collection,
            &context.category,
            download.kind,
            slug,
            download.extension,
        );

        let (preview_url, download_url) = tokio::try_join!(
            sinks
                .uploader
                .upload(preview.bytes, &preview_key, preview.content_type),
            sinks
                .uploader
                .upload(download.bytes, &download_key, download.content_type),
        )?;

        let record = CatalogRecord {
            slug: slug.to_string(),
            title: title_from_filename(file_name),
            category: context.category.clone(),
            device: context.device,
            preview_url: preview_url.clone(),
            download_url: download_url.clone(),
            width,
            height,
            download_size,
            tags: tags_from_filename(file_name, &context.category, context.device),
            preview_key,
            download_key,
            original_filename: file_name.to_string(),
            content_hash,
            created_at: Utc::now(),
        };

        match sinks.catalog.insert(&record).await {
            Ok(()) => Ok((
                ItemOutcome::Cataloged {
                    preview_url,
                    download_url,
                    download_size,
                },
                Some(record),
            )),
            Err(PipelineError::Conflict { slug }) => {
                tracing::debug!("Insert for {slug} lost a race, counting as duplicate");
                Ok((ItemOutcome::DuplicateSkip, None))
            }
            Err(e) => Err(e),
        }
    }
}

/// Turn every candidate after the first with a given slug into `Shadowed`.
fn shadow_duplicate_slugs(plan: &mut Plan, device: Device) {
    let mut claimed: HashMap<String, String> = HashMap::new();
    for (category, items) in plan.iter_mut() {
        for item in items.iter_mut() {
            let file_name = item.file_name().to_string();
            let slug = slug_for(&file_name, category, device);
            if let Some(first) = claimed.get(&slug) {
                tracing::warn!(
                    "{} in {} has the same slug as {} ({}), it will be skipped",
                    file_name,
                    category,
                    first,
                    slug
                );
                *item = WorkItem::Shadowed {
                    file_name,
                    first: first.clone(),
                };
            } else {
                claimed.insert(slug, file_name);
            }
        }
    }
}

/// Write artifacts to `<dir>/<category>/<kind>/<stem>.<ext>`.
async fn persist_locally(
    output_dir: &Path,
    category: &str,
    file_name: &str,
    artifacts: [&DerivedArtifact; 2],
) -> PipelineResult<()> {
    let stem = file_stem(file_name);
    for artifact in artifacts {
        let dir = output_dir.join(category).join(artifact.kind.as_str());
        let path = dir.join(format!("{stem}.{}", artifact.extension));
        let io_error = |e: std::io::Error| PipelineError::Io {
            path: path.clone(),
            message: e.to_string(),
        };
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .map_err(io_error)?;
    }
    Ok(())
}
