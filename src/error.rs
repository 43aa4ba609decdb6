use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a pipeline run before any derived table is written.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing census file at {}", .0.display())]
    MissingCensusFile(PathBuf),

    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("{file}: no indicator row labelled '{label}'")]
    IndicatorNotFound { file: String, label: String },

    #[error("{file}: indicator label '{label}' matches {count} rows")]
    AmbiguousIndicator {
        file: String,
        label: String,
        count: usize,
    },

    #[error("{file}: no '!!Estimate' columns found")]
    NoEstimateColumns { file: String },

    #[error("{file}: state '{state}' appears more than once")]
    DuplicateState { file: String, state: String },

    #[error("{file}: no income column found; available columns: {available}")]
    NoIncomeColumn { file: String, available: String },

    #[error("Remote descriptor has no distribution[0].downloadURL")]
    MissingDownloadUrl,

    #[error("Payments cache {} is absent and remote fetch is disabled", .0.display())]
    FetchDisabled(PathBuf),
}
