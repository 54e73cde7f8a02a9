//! Column-mapping and duplicate-reconciliation engine for importing
//! extracted cable-laying records into a spreadsheet dataset.
//!
//! The destination, the mapping store, the extraction service and the user
//! prompts are all ports (`usecase::ports`); `infra` provides SQLite and
//! in-memory implementations.

pub mod config;
pub mod domain;
pub mod infra;
pub mod platform;
pub mod usecase;

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use log::LevelFilter;

pub use config::ImportConfig;
pub use domain::catalog::{AliasCatalog, CanonicalColumn};
pub use domain::dedup::{DedupEngine, KeyColumnSet};
pub use domain::entities::batch::{CandidateSet, ExtractedBatch};
pub use domain::entities::mapping::{HeaderMapping, MappingOrigin};
pub use domain::normalize::normalize;
pub use usecase::error::ImportError;
pub use usecase::services::import_service::{ImportPorts, ImportService};
pub use usecase::services::merge_coordinator::MergeReport;

static LOGGER: OnceLock<()> = OnceLock::new();

/// Installs `env_logger` once; the crate logs at Info unless `RUST_LOG`
/// says otherwise.
pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("pmfusion", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// SQLite file holding destination datasets and the mapping store.
pub fn default_db_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "pmfusion", "pmfusion")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().join("datasets.sqlite"))
}

#[cfg(test)]
mod tests;
