use std::path::{Path, PathBuf};

use crate::data::store::TableFormat;

/// Open Payments metastore descriptor for the national general-payments file.
pub const DEFAULT_SOURCE_URL: &str =
    "https://openpaymentsdata.cms.gov/api/1/metastore/schemas/dataset/items/fb3a65aa-c901-4a38-a813-b04b00dfa2a9";

pub const DEFAULT_RAW_DIR: &str = "data/raw-data";
pub const DEFAULT_DERIVED_DIR: &str = "data/derived-data";
pub const PAYMENTS_FILE: &str = "open_payments_2023_national.csv";
pub const CENSUS_FILE: &str = "ACSDP1Y2023.DP03.csv";

/// Where the pipeline reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Local cache of the payments file; fetched when absent.
    pub payments_path: PathBuf,
    /// Census cross-tab. Must exist.
    pub census_path: PathBuf,
    pub out_dir: PathBuf,
    pub format: TableFormat,
    pub source_url: String,
    /// Fail instead of fetching when the payments cache is missing.
    pub offline: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_raw_dir(Path::new(DEFAULT_RAW_DIR), Path::new(DEFAULT_DERIVED_DIR))
    }
}

impl PipelineConfig {
    /// Default file names under the given raw and output directories.
    pub fn with_raw_dir(raw_dir: &Path, out_dir: &Path) -> Self {
        Self {
            payments_path: raw_dir.join(PAYMENTS_FILE),
            census_path: raw_dir.join(CENSUS_FILE),
            out_dir: out_dir.to_path_buf(),
            format: TableFormat::Csv,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            offline: false,
        }
    }
}
