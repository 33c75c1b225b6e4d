//! Command handlers.

pub mod config;
pub mod ingest;

use std::path::{Path, PathBuf};

use curator_core::config::expand_path;
use curator_core::Config;

/// The config file in effect: `--config` if given, else the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(expand_path)
        .unwrap_or_else(Config::default_path)
}

/// Load configuration.
///
/// An explicit path must exist; the default location falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => Config::load_from(&expand_path(path))
            .map_err(|e| anyhow::anyhow!("{e} ({})", path.display()))?,
        None => Config::load()?,
    };
    Ok(config)
}
