use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt64Array, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::aggregate::{assign_income_percentiles, per_household};
use super::lookup;
use super::model::{DerivedTables, DetailAggregate, StateSummary};
use crate::error::PipelineError;

pub const STATE_SUMMARY_STEM: &str = "cms_acs_state_summary";
pub const DETAIL_STEM: &str = "cms_payments_details";

/// Accepted names for the income column, in order of preference.
pub const INCOME_COLUMNS: [&str; 3] = ["median_income", "median_household_income", "household_income"];

const SUMMARY_REQUIRED: [&str; 3] = ["state", "total_payment_amount", "total_households"];
const DETAIL_REQUIRED: [&str; 4] = ["state", "specialty_clean", "payment_type_clean", "payment_amount"];

// ---------------------------------------------------------------------------
// Format selection
// ---------------------------------------------------------------------------

/// On-disk format of the derived tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TableFormat {
    #[default]
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }

    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(TableFormat::Csv),
            "parquet" | "pq" => Some(TableFormat::Parquet),
            _ => None,
        }
    }
}

/// Paths of the two derived tables inside `dir` for `format`.
pub fn table_paths(dir: &Path, format: TableFormat) -> (PathBuf, PathBuf) {
    let ext = format.extension();
    (
        dir.join(format!("{STATE_SUMMARY_STEM}.{ext}")),
        dir.join(format!("{DETAIL_STEM}.{ext}")),
    )
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Persist both tables. Each is written to a `.tmp` sibling first and only
/// renamed into place once both writes succeeded.
pub fn write_tables(tables: &DerivedTables, dir: &Path, format: TableFormat) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let (summary_path, detail_path) = table_paths(dir, format);
    let summary_tmp = tmp_path(&summary_path);
    let detail_tmp = tmp_path(&detail_path);

    let written = stage_tables(tables, format, &summary_tmp, &detail_tmp).and_then(|()| {
        fs::rename(&summary_tmp, &summary_path)
            .with_context(|| format!("moving {} into place", summary_path.display()))?;
        fs::rename(&detail_tmp, &detail_path)
            .with_context(|| format!("moving {} into place", detail_path.display()))
    });
    if let Err(err) = written {
        discard_tmp(&[&summary_tmp, &detail_tmp]);
        return Err(err);
    }

    info!(
        "Wrote {} state rows to {} and {} detail rows to {}",
        tables.states.len(),
        summary_path.display(),
        tables.details.len(),
        detail_path.display()
    );
    Ok((summary_path, detail_path))
}

fn stage_tables(tables: &DerivedTables, format: TableFormat, summary_tmp: &Path, detail_tmp: &Path) -> Result<()> {
    match format {
        TableFormat::Csv => {
            write_csv(&tables.states, summary_tmp)?;
            write_csv(&tables.details, detail_tmp)
        }
        TableFormat::Parquet => {
            write_parquet(summary_batch(&tables.states)?, summary_tmp)?;
            write_parquet(detail_batch(&tables.details)?, detail_tmp)
        }
    }
}

/// Best-effort removal of scratch files left by a failed write.
pub(crate) fn discard_tmp(paths: &[&Path]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {e}", path.display()),
        }
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    wtr.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

fn write_parquet(batch: RecordBatch, path: &Path) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("finalising parquet file")?;
    Ok(())
}

fn summary_batch(states: &[StateSummary]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("state", DataType::Utf8, false),
        Field::new("total_payment_amount", DataType::Float64, false),
        Field::new("median_income", DataType::Float64, true),
        Field::new("total_households", DataType::UInt64, true),
        Field::new("payment_per_household", DataType::Float64, true),
        Field::new("fips_code", DataType::UInt8, true),
        Field::new("income_percentile", DataType::Float64, true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(states.iter().map(|s| s.state.as_str()))),
        Arc::new(Float64Array::from_iter_values(states.iter().map(|s| s.total_payment_amount))),
        Arc::new(states.iter().map(|s| s.median_income).collect::<Float64Array>()),
        Arc::new(states.iter().map(|s| s.total_households).collect::<UInt64Array>()),
        Arc::new(states.iter().map(|s| s.payment_per_household).collect::<Float64Array>()),
        Arc::new(states.iter().map(|s| s.fips_code).collect::<UInt8Array>()),
        Arc::new(states.iter().map(|s| s.income_percentile).collect::<Float64Array>()),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("building state summary batch")
}

fn detail_batch(details: &[DetailAggregate]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("state", DataType::Utf8, false),
        Field::new("specialty_clean", DataType::Utf8, false),
        Field::new("payment_type_clean", DataType::Utf8, false),
        Field::new("payment_amount", DataType::Float64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(details.iter().map(|d| d.state.as_str()))),
        Arc::new(StringArray::from_iter_values(details.iter().map(|d| d.specialty_clean.as_str()))),
        Arc::new(StringArray::from_iter_values(details.iter().map(|d| d.payment_type_clean.as_str()))),
        Arc::new(Float64Array::from_iter_values(details.iter().map(|d| d.payment_amount))),
    ];
    RecordBatch::try_new(Arc::new(schema), columns).context("building detail batch")
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Load both derived tables from `dir`, preferring CSV over Parquet when
/// both exist. Missing `fips_code`, `income_percentile` and
/// `payment_per_household` values are filled in.
pub fn load_tables(dir: &Path) -> Result<DerivedTables> {
    let summary_path = locate(dir, STATE_SUMMARY_STEM)?;
    let detail_path = locate(dir, DETAIL_STEM)?;

    let mut states = match TableFormat::from_path(&summary_path) {
        Some(TableFormat::Parquet) => read_summary_parquet(&summary_path)?,
        _ => read_summary_csv(&summary_path)?,
    };
    let details = match TableFormat::from_path(&detail_path) {
        Some(TableFormat::Parquet) => read_detail_parquet(&detail_path)?,
        _ => read_detail_csv(&detail_path)?,
    };

    backfill(&mut states);
    info!(
        "Loaded {} state rows and {} detail rows from {}",
        states.len(),
        details.len(),
        dir.display()
    );
    Ok(DerivedTables { states, details })
}

fn locate(dir: &Path, stem: &str) -> Result<PathBuf> {
    [TableFormat::Csv, TableFormat::Parquet]
        .iter()
        .map(|f| dir.join(format!("{stem}.{}", f.extension())))
        .find(|p| p.is_file())
        .with_context(|| format!("no {stem}.csv or {stem}.parquet in {}", dir.display()))
}

fn backfill(states: &mut [StateSummary]) {
    for s in states.iter_mut() {
        if s.fips_code.is_none() {
            s.fips_code = lookup::fips_code(&s.state);
        }
        if s.payment_per_household.is_none() {
            s.payment_per_household = per_household(s.total_payment_amount, s.total_households);
        }
    }
    if states.iter().all(|s| s.income_percentile.is_none()) {
        assign_income_percentiles(states);
    }
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn check_headers(headers: &[&str], required: &[&str], file: &str) -> Result<(), PipelineError> {
    match required.iter().find(|col| !headers.contains(*col)) {
        Some(col) => Err(PipelineError::MissingColumn {
            file: file.to_string(),
            column: col.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_income_column(headers: &[&str], file: &str) -> Result<(), PipelineError> {
    if INCOME_COLUMNS.iter().any(|c| headers.contains(c)) {
        Ok(())
    } else {
        Err(PipelineError::NoIncomeColumn {
            file: file.to_string(),
            available: headers.join(", "),
        })
    }
}

fn read_csv<T: DeserializeOwned>(
    path: &Path,
    check: impl Fn(&[&str], &str) -> Result<(), PipelineError>,
) -> Result<Vec<T>> {
    let file = display_name(path);
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("opening {file}"))?;
    let headers = rdr.headers().with_context(|| format!("{file}: reading headers"))?.clone();
    let names: Vec<&str> = headers.iter().collect();
    check(&names, &file)?;

    rdr.deserialize()
        .enumerate()
        .map(|(row_no, r)| r.with_context(|| format!("{file}: row {row_no}")))
        .collect()
}

fn read_summary_csv(path: &Path) -> Result<Vec<StateSummary>> {
    read_csv(path, |names, file| {
        check_income_column(names, file)?;
        check_headers(names, &SUMMARY_REQUIRED, file)
    })
}

fn read_detail_csv(path: &Path) -> Result<Vec<DetailAggregate>> {
    read_csv(path, |names, file| check_headers(names, &DETAIL_REQUIRED, file))
}

// -- Parquet helpers --

fn parquet_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;
    reader
        .map(|b| b.context("reading parquet record batch"))
        .collect()
}

fn typed_column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str, file: &str) -> Result<Option<&'a T>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let typed = col
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("{file}: column '{name}' has unexpected type {:?}", col.data_type()))?;
    Ok(Some(typed))
}

fn required_column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str, file: &str) -> Result<&'a T> {
    typed_column(batch, name, file)?.ok_or_else(|| {
        PipelineError::MissingColumn {
            file: file.to_string(),
            column: name.to_string(),
        }
        .into()
    })
}

fn value_at<T, A: Array>(arr: Option<&A>, row: usize, get: impl Fn(&A, usize) -> T) -> Option<T> {
    arr.filter(|a| a.is_valid(row)).map(|a| get(a, row))
}

fn read_summary_parquet(path: &Path) -> Result<Vec<StateSummary>> {
    let file = display_name(path);
    let mut states = Vec::new();
    for batch in parquet_batches(path)? {
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        check_income_column(&names, &file)?;
        let income_name = INCOME_COLUMNS
            .iter()
            .find(|c| names.contains(*c))
            .copied()
            .unwrap_or(INCOME_COLUMNS[0]);

        let state = required_column::<StringArray>(&batch, "state", &file)?;
        let total = required_column::<Float64Array>(&batch, "total_payment_amount", &file)?;
        let households = required_column::<UInt64Array>(&batch, "total_households", &file)?;
        let income = typed_column::<Float64Array>(&batch, income_name, &file)?;
        let ratio = typed_column::<Float64Array>(&batch, "payment_per_household", &file)?;
        let fips = typed_column::<UInt8Array>(&batch, "fips_code", &file)?;
        let pct = typed_column::<Float64Array>(&batch, "income_percentile", &file)?;

        for row in 0..batch.num_rows() {
            states.push(StateSummary {
                state: state.value(row).to_string(),
                total_payment_amount: total.value(row),
                median_income: value_at(income, row, Float64Array::value),
                total_households: value_at(Some(households), row, UInt64Array::value),
                payment_per_household: value_at(ratio, row, Float64Array::value),
                fips_code: value_at(fips, row, UInt8Array::value),
                income_percentile: value_at(pct, row, Float64Array::value),
            });
        }
    }
    Ok(states)
}

fn read_detail_parquet(path: &Path) -> Result<Vec<DetailAggregate>> {
    let file = display_name(path);
    let mut details = Vec::new();
    for batch in parquet_batches(path)? {
        let state = required_column::<StringArray>(&batch, "state", &file)?;
        let specialty = required_column::<StringArray>(&batch, "specialty_clean", &file)?;
        let kind = required_column::<StringArray>(&batch, "payment_type_clean", &file)?;
        let amount = required_column::<Float64Array>(&batch, "payment_amount", &file)?;

        for row in 0..batch.num_rows() {
            details.push(DetailAggregate {
                state: state.value(row).to_string(),
                specialty_clean: specialty.value(row).to_string(),
                payment_type_clean: kind.value(row).to_string(),
                payment_amount: amount.value(row),
            });
        }
    }
    Ok(details)
}
