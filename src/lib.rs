//! # Salesboard
//!
//! Fetch a sales dataset (or generate fake task assignments), filter it,
//! aggregate it and format the figures for a dashboard.
//!
//! ## Usage
//!
//! ```bash
//! salesboard sales [--region sul] [--year 2022] [--top 5]
//! salesboard tasks [--window today] [--seed 7]
//! ```
//!
//! ## Modules
//!
//! - `record` - Immutable records and scalar field values
//! - `source` - Record sources: the products API and the synthetic task generator
//! - `filter` - Predicate conjunctions and the dashboard filter selections
//! - `aggregate` - Group-by sums and counts, monthly buckets, top-N
//! - `allocation` - Per-user allocated, free and exceeded hours
//! - `format` - Unit-scaled number formatting
//! - `pipeline` - Load → filter → aggregate runs
//! - `report` - Report values and their text rendering
//! - `config` - Configuration loading with environment overrides
pub mod aggregate;
pub mod allocation;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod source;

pub use error::{PipelineError, Result, UnavailableReason};
