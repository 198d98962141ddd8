//! # Statframe - tabular transformations over baseball statistics
//!
//! Statframe loads typed tables (the packaged Lahman-style `batting`,
//! `people` and `teams` samples, or CSV files from a directory) and runs
//! them through joins, filters, derived columns, grouped summaries and
//! wide/long reshaping. Results can be printed, written as JSON/CSV or
//! handed to a Vega-Lite renderer as a scatter plot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Datasets   │────▶│   Parser    │────▶│  Transform  │────▶│   Output    │
//! │ (bundled/   │     │ (typed CSV, │     │ (pipeline   │     │ (table/json │
//! │  directory) │     │  auto-enc)  │     │  of stages) │     │ /csv/chart) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use statframe::{col, lit, BundledDatasets, DatasetProvider, Pipeline};
//!
//! let batting = BundledDatasets.load("batting")?;
//! let people = BundledDatasets.load("people")?;
//!
//! let modern = Pipeline::new()
//!     .left_join(people, &["playerID"])
//!     .filter(col("yearID").gt_eq(lit(1955)))
//!     .run(&batting)?;
//! println!("{}", modern.head(10));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Values, schemas and tables
//! - [`parser`] - Typed CSV reading/writing with auto-detection
//! - [`dataset`] - Dataset providers and the data dictionary
//! - [`transform`] - Table operations and pipelines
//! - [`chart`] - Vega-Lite scatter-plot hand-off
//! - [`walkthrough`] - Guided tour over the sample data
//! - [`config`] - Environment settings and output formats

// Core modules
pub mod error;
pub mod models;

// Input
pub mod dataset;
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod chart;
pub mod config;

pub mod walkthrough;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ChartError, ChartResult, DatasetError, DatasetResult, PipelineError, PipelineResult,
    SchemaError, TableError, TableResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{DataType, Field, Schema, Table, Value};

// =============================================================================
// Re-exports - Datasets & parsing
// =============================================================================

pub use dataset::{BundledDatasets, DatasetProvider, DirectoryDatasets, LayeredDatasets};
pub use parser::{read_table, read_table_auto, write_csv};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    col, concat, filter, filter_select, group_aggregate, head, left_join, left_join_with, lit,
    mutate, pivot_long, pivot_long_with, pivot_wide, rename, select, sort, unite, Aggregation,
    Assignment, Expr, JoinSuffix, Pipeline, PipelinePlan, Reducer, Stage, StageReport,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use chart::ScatterPlot;
pub use config::{OutputFormat, Settings};
