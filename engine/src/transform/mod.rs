//! Table operations.
//!
//! Every operation borrows its input table(s) and returns a new [`Table`]:
//! - Expr: row expressions for filtering and derived columns
//! - Join: left-outer join on key columns
//! - Filter / Mutate: row selection, projection, derived and renamed columns
//! - Aggregate: grouped summaries, sorting, truncation
//! - Reshape: wide/long pivots
//! - Pipeline: fluent and JSON-described compositions of the above
//!
//! [`Table`]: crate::models::Table

pub mod aggregate;
pub mod expr;
pub mod filter;
pub(crate) mod grouper;
pub mod join;
pub mod mutate;
pub mod pipeline;
pub mod reshape;

pub use aggregate::{group_aggregate, head, sort, Aggregation, Reducer};
pub use expr::{col, concat, lit, BoundExpr, Expr};
pub use filter::{filter, filter_select, select};
pub use join::{left_join, left_join_with, JoinSuffix};
pub use mutate::{mutate, rename, unite, Assignment};
pub use pipeline::{Pipeline, PipelinePlan, Stage, StageReport};
pub use reshape::{pivot_long, pivot_long_with, pivot_wide};
