//! Pipeline setup: config overrides, object store and catalog construction.

use std::sync::Arc;

use curator_core::config::expand_path;
use curator_core::{Config, Pipeline, S3Store, SqliteCatalog};

use super::IngestArgs;

/// Apply CLI overrides and assemble the pipeline for this run.
///
/// Dry runs never touch the object store or the catalog, so neither is
/// opened and no credentials are required.
pub fn build_pipeline(args: &IngestArgs, mut config: Config) -> anyhow::Result<Pipeline> {
    apply_overrides(args, &mut config)?;

    if args.dry_run {
        tracing::info!("Dry run: nothing will be uploaded or cataloged");
        return Ok(Pipeline::dry_run_only(config));
    }

    let store = S3Store::from_config(&config.storage)?;
    tracing::debug!(
        "Object store ready (bucket {:?}, endpoint {:?})",
        config.storage.bucket,
        config.storage.endpoint
    );

    let catalog_path = config.catalog_path();
    let catalog = SqliteCatalog::open(&catalog_path)?;
    tracing::info!("Catalog: {}", catalog_path.display());

    Ok(Pipeline::new(config, Arc::new(catalog), Arc::new(store)))
}

fn apply_overrides(args: &IngestArgs, config: &mut Config) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        config.pipeline.parallel_workers = parallel;
    }
    if let Some(catalog) = &args.catalog {
        config.catalog.path = expand_path(catalog);
    }
    config.pipeline.batch_size = args.batch_size;
    config.validate()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::DeviceArg;
    use super::*;
    use std::path::PathBuf;

    fn args() -> IngestArgs {
        IngestArgs {
            source: PathBuf::from("./walls"),
            category: Some("nature".to_string()),
            all_categories: false,
            device: DeviceArg::Desktop,
            batch_size: 20,
            parallel: None,
            dry_run: true,
            output_dir: None,
            skip: 0,
            limit: None,
            from_output: false,
            catalog: None,
            manifest: None,
            json: false,
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = Config::default();
        let args = IngestArgs {
            parallel: Some(8),
            catalog: Some(PathBuf::from("/tmp/walls.db")),
            batch_size: 5,
            ..args()
        };
        apply_overrides(&args, &mut config).unwrap();
        assert_eq!(config.pipeline.parallel_workers, 8);
        assert_eq!(config.pipeline.batch_size, 5);
        assert_eq!(config.catalog_path(), PathBuf::from("/tmp/walls.db"));
    }

    #[test]
    fn test_zero_parallel_is_rejected() {
        let mut config = Config::default();
        let args = IngestArgs {
            parallel: Some(0),
            ..args()
        };
        let err = apply_overrides(&args, &mut config).unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_dry_run_needs_no_storage_config() {
        assert!(build_pipeline(&args(), Config::default()).is_ok());
    }

    #[test]
    fn test_live_run_without_bucket_is_fatal() {
        let args = IngestArgs {
            dry_run: false,
            ..args()
        };
        let err = build_pipeline(&args, Config::default()).err().expect("expected build_pipeline to fail");
        assert!(err.to_string().contains("storage.bucket"));
    }
}
