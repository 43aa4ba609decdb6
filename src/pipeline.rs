//! End-to-end preprocessing run: raw sources in, two derived tables out.
//!
//! The run is all-or-nothing. Every fatal condition is raised before the
//! first table is written, and the writer only renames finished files into
//! place.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::config::PipelineConfig;
use crate::data::aggregate::build_tables;
use crate::data::clean::{clean_census, clean_payments};
use crate::data::model::DerivedTables;
use crate::data::raw;
use crate::data::store::write_tables;

/// Result of a completed run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub tables: DerivedTables,
    pub summary_path: PathBuf,
    pub detail_path: PathBuf,
}

/// Load, clean, join and aggregate without writing anything.
pub fn prepare(config: &PipelineConfig) -> Result<DerivedTables> {
    let census_path = raw::ensure_census(config)?;
    let payments_path = raw::ensure_payments(config)?;

    info!("Cleaning payments data...");
    let records = clean_payments(open(&payments_path)?, &payments_path.display().to_string())?;

    info!("Processing census data...");
    let indicators = clean_census(open(&census_path)?, &census_path.display().to_string())?;

    info!("Merging datasets...");
    Ok(build_tables(&records, &indicators))
}

/// Run the full pipeline and persist the derived tables.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    let tables = prepare(config)?;
    let (summary_path, detail_path) = write_tables(&tables, &config.out_dir, config.format)?;
    info!("Preprocessing complete");
    Ok(PipelineOutput {
        tables,
        summary_path,
        detail_path,
    })
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("opening {}", path.display()))
}
