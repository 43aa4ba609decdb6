//! Build the derived state-summary and detail tables from the raw payments
//! and census files.
//!
//! Examples:
//!   preprocess
//!   preprocess --raw-dir data/raw-data --out-dir data/derived-data
//!   preprocess --offline --format parquet

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use payment_lens::config::{self, PipelineConfig};
use payment_lens::data::store::TableFormat;
use payment_lens::pipeline;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the raw payments cache and census file
    #[arg(long, default_value = config::DEFAULT_RAW_DIR, env = "PAYMENT_LENS_RAW_DIR")]
    raw_dir: PathBuf,

    /// Payments cache file (defaults to <raw-dir>/open_payments_2023_national.csv)
    #[arg(long, value_name = "FILE", env = "PAYMENT_LENS_PAYMENTS")]
    payments: Option<PathBuf>,

    /// Census indicator file (defaults to <raw-dir>/ACSDP1Y2023.DP03.csv)
    #[arg(long, value_name = "FILE", env = "PAYMENT_LENS_CENSUS")]
    census: Option<PathBuf>,

    /// Output directory for the derived tables
    #[arg(long, default_value = config::DEFAULT_DERIVED_DIR, env = "PAYMENT_LENS_DATA_DIR")]
    out_dir: PathBuf,

    /// Derived table format
    #[arg(long, value_enum, default_value_t = TableFormat::Csv, env = "PAYMENT_LENS_FORMAT")]
    format: TableFormat,

    /// Dataset descriptor used when the payments cache is missing
    #[arg(long, default_value = config::DEFAULT_SOURCE_URL, env = "PAYMENT_LENS_SOURCE_URL")]
    source_url: String,

    /// Never download; fail if the payments cache is missing
    #[arg(long, env = "PAYMENT_LENS_OFFLINE")]
    offline: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::with_raw_dir(&self.raw_dir, &self.out_dir);
        if let Some(p) = self.payments {
            config.payments_path = p;
        }
        if let Some(p) = self.census {
            config.census_path = p;
        }
        config.format = self.format;
        config.source_url = self.source_url;
        config.offline = self.offline;
        config
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = args.into_config();
    match pipeline::run(&config) {
        Ok(out) => {
            log::info!(
                "{} states -> {}, {} detail rows -> {}",
                out.tables.states.len(),
                out.summary_path.display(),
                out.tables.details.len(),
                out.detail_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Preprocessing failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
