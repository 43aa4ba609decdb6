//! Data layer: raw sources, cleaning, aggregation and the filter engine.
//!
//! Architecture:
//! ```text
//!  payments CSV (cache or remote)     census cross-tab CSV
//!        │                                   │
//!        ▼                                   ▼
//!   ┌──────────┐                       ┌──────────┐
//!   │   raw    │  cache / fetch        │   raw    │  existence check
//!   └──────────┘                       └──────────┘
//!        │                                   │
//!        ▼                                   ▼
//!   ┌──────────┐                       ┌──────────┐
//!   │  clean   │  → PaymentRecord      │  clean   │  → StateIndicator
//!   └──────────┘                       └──────────┘
//!        └──────────────┬────────────────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │  aggregate   │  → StateSummary + DetailAggregate
//!               └──────────────┘
//!                       │
//!                       ▼
//!               ┌──────────────┐
//!               │    store     │  csv / parquet, written once per run
//!               └──────────────┘
//!                       │
//!                       ▼
//!               ┌──────────────┐
//!               │    filter    │  constraints → rows, metrics, Lorenz
//!               └──────────────┘
//! ```

pub mod aggregate;
pub mod clean;
pub mod filter;
pub mod lookup;
pub mod model;
pub mod raw;
pub mod stats;
pub mod store;
