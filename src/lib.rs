//! Healthcare industry payment inequality: preprocessing pipeline and the
//! filter/metric engine behind the dashboard.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

pub use config::PipelineConfig;
pub use data::filter::{evaluate, Constraints, FilterOutcome};
pub use data::model::{DerivedTables, DetailAggregate, StateSummary};
pub use error::PipelineError;
