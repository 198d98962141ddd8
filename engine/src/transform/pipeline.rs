//! Composing operations into pipelines.
//!
//! Two ways to chain operations, both left to right:
//!
//! - [`Pipeline`]: a fluent builder whose stages own their parameters
//!   (including the right-hand table of a join) and run against one input.
//! - [`PipelinePlan`]: the same stages as JSON, naming tables instead of
//!   holding them. A plan is bound against a [`DatasetProvider`] to get a
//!   runnable [`Pipeline`].
//!
//! # Plan format
//!
//! ```json
//! {
//!   "source": "batting",
//!   "stages": [
//!     { "stage": "left_join", "right": "people", "on": ["playerID"] },
//!     { "stage": "filter", "predicate": {
//!         "op": "ge",
//!         "left": { "op": "col", "name": "yearID" },
//!         "right": { "op": "lit", "value": 1955 } } },
//!     { "stage": "head", "n": 10 }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::aggregate::{group_aggregate, head, sort, Aggregation};
use super::expr::Expr;
use super::filter::{filter, select};
use super::join::{left_join_with, JoinSuffix};
use super::mutate::{mutate, rename, unite, Assignment};
use super::reshape::{pivot_long_with, pivot_wide};
use crate::dataset::DatasetProvider;
use crate::error::{DatasetResult, PipelineResult, TableResult};
use crate::models::Table;

// =============================================================================
// Stages
// =============================================================================

/// One step of a pipeline.
///
/// `R` is the right-hand side of a join: a [`Table`] when the stage is
/// runnable, a dataset name (`String`) inside a [`PipelinePlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage<R = Table> {
    LeftJoin {
        right: R,
        on: Vec<String>,
        #[serde(default)]
        suffix: JoinSuffix,
    },
    Filter {
        predicate: Expr,
    },
    Select {
        columns: Vec<String>,
    },
    Mutate {
        assignments: Vec<Assignment>,
    },
    Unite {
        name: String,
        sources: Vec<String>,
        #[serde(default = "default_separator")]
        separator: String,
        #[serde(default)]
        skip_missing: bool,
    },
    /// `(old, new)` pairs.
    Rename {
        mapping: Vec<(String, String)>,
    },
    GroupAggregate {
        #[serde(default)]
        by: Vec<String>,
        aggregations: Vec<Aggregation>,
    },
    Sort {
        by: Vec<String>,
        #[serde(default)]
        descending: bool,
    },
    Head {
        n: usize,
    },
    PivotWide {
        id_columns: Vec<String>,
        key_column: String,
        value_column: String,
    },
    PivotLong {
        id_columns: Vec<String>,
        #[serde(default = "default_key_name")]
        key_name: String,
        #[serde(default = "default_value_name")]
        value_name: String,
        #[serde(default)]
        drop_missing: bool,
    },
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_key_name() -> String {
    "key".to_string()
}

fn default_value_name() -> String {
    "value".to_string()
}

impl<R> Stage<R> {
    /// Stage kind, as spelled in plan files.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::LeftJoin { .. } => "left_join",
            Stage::Filter { .. } => "filter",
            Stage::Select { .. } => "select",
            Stage::Mutate { .. } => "mutate",
            Stage::Unite { .. } => "unite",
            Stage::Rename { .. } => "rename",
            Stage::GroupAggregate { .. } => "group_aggregate",
            Stage::Sort { .. } => "sort",
            Stage::Head { .. } => "head",
            Stage::PivotWide { .. } => "pivot_wide",
            Stage::PivotLong { .. } => "pivot_long",
        }
    }

    /// Replace the join operand, leaving every other stage as is.
    pub fn try_map_right<T, E, F>(self, f: F) -> Result<Stage<T>, E>
    where
        F: FnOnce(R) -> Result<T, E>,
    {
        Ok(match self {
            Stage::LeftJoin { right, on, suffix } => Stage::LeftJoin {
                right: f(right)?,
                on,
                suffix,
            },
            Stage::Filter { predicate } => Stage::Filter { predicate },
            Stage::Select { columns } => Stage::Select { columns },
            Stage::Mutate { assignments } => Stage::Mutate { assignments },
            Stage::Unite {
                name,
                sources,
                separator,
                skip_missing,
            } => Stage::Unite {
                name,
                sources,
                separator,
                skip_missing,
            },
            Stage::Rename { mapping } => Stage::Rename { mapping },
            Stage::GroupAggregate { by, aggregations } => Stage::GroupAggregate { by, aggregations },
            Stage::Sort { by, descending } => Stage::Sort { by, descending },
            Stage::Head { n } => Stage::Head { n },
            Stage::PivotWide {
                id_columns,
                key_column,
                value_column,
            } => Stage::PivotWide {
                id_columns,
                key_column,
                value_column,
            },
            Stage::PivotLong {
                id_columns,
                key_name,
                value_name,
                drop_missing,
            } => Stage::PivotLong {
                id_columns,
                key_name,
                value_name,
                drop_missing,
            },
        })
    }
}

impl Stage {
    /// Run this stage against `input`.
    pub fn apply(&self, input: &Table) -> TableResult<Table> {
        match self {
            Stage::LeftJoin { right, on, suffix } => left_join_with(input, right, on, suffix),
            Stage::Filter { predicate } => filter(input, predicate),
            Stage::Select { columns } => select(input, columns),
            Stage::Mutate { assignments } => mutate(input, assignments),
            Stage::Unite {
                name,
                sources,
                separator,
                skip_missing,
            } => unite(input, name, sources, separator, *skip_missing),
            Stage::Rename { mapping } => rename(input, mapping),
            Stage::GroupAggregate { by, aggregations } => group_aggregate(input, by, aggregations),
            Stage::Sort { by, descending } => sort(input, by, *descending),
            Stage::Head { n } => Ok(head(input, *n)),
            Stage::PivotWide {
                id_columns,
                key_column,
                value_column,
            } => pivot_wide(input, id_columns, key_column, value_column),
            Stage::PivotLong {
                id_columns,
                key_name,
                value_name,
                drop_missing,
            } => pivot_long_with(input, id_columns, key_name, value_name, *drop_missing),
        }
    }
}

/// Shape of the table after one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub rows: usize,
    pub columns: usize,
}

// =============================================================================
// Pipeline builder
// =============================================================================

/// An ordered list of stages.
///
/// ```rust,ignore
/// let seasons = Pipeline::new()
///     .left_join(people, &["playerID"])
///     .mutate(vec![Assignment::new("name", concat([col("nameFirst"), col("nameLast")], " "))])
///     .filter(col("yearID").gt_eq(lit(1955)).and(col("AB").gt_eq(lit(200))))
///     .run(&batting)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

fn owned<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|s| s.as_ref().to_string()).collect()
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Append an arbitrary stage.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn left_join<S: AsRef<str>>(self, right: Table, on: &[S]) -> Self {
        self.with_stage(Stage::LeftJoin {
            right,
            on: owned(on),
            suffix: JoinSuffix::default(),
        })
    }

    pub fn filter(self, predicate: Expr) -> Self {
        self.with_stage(Stage::Filter { predicate })
    }

    pub fn select<S: AsRef<str>>(self, columns: &[S]) -> Self {
        self.with_stage(Stage::Select {
            columns: owned(columns),
        })
    }

    pub fn mutate(self, assignments: Vec<Assignment>) -> Self {
        self.with_stage(Stage::Mutate { assignments })
    }

    pub fn unite<S: AsRef<str>>(self, name: &str, sources: &[S], separator: &str) -> Self {
        self.with_stage(Stage::Unite {
            name: name.to_string(),
            sources: owned(sources),
            separator: separator.to_string(),
            skip_missing: false,
        })
    }

    pub fn rename(self, mapping: &[(&str, &str)]) -> Self {
        self.with_stage(Stage::Rename {
            mapping: mapping
                .iter()
                .map(|(old, new)| (old.to_string(), new.to_string()))
                .collect(),
        })
    }

    pub fn group_aggregate<S: AsRef<str>>(self, by: &[S], aggregations: Vec<Aggregation>) -> Self {
        self.with_stage(Stage::GroupAggregate {
            by: owned(by),
            aggregations,
        })
    }

    pub fn sort<S: AsRef<str>>(self, by: &[S], descending: bool) -> Self {
        self.with_stage(Stage::Sort {
            by: owned(by),
            descending,
        })
    }

    pub fn head(self, n: usize) -> Self {
        self.with_stage(Stage::Head { n })
    }

    pub fn pivot_wide<S: AsRef<str>>(self, id_columns: &[S], key_column: &str, value_column: &str) -> Self {
        self.with_stage(Stage::PivotWide {
            id_columns: owned(id_columns),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        })
    }

    pub fn pivot_long<S: AsRef<str>>(self, id_columns: &[S], key_name: &str, value_name: &str) -> Self {
        self.with_stage(Stage::PivotLong {
            id_columns: owned(id_columns),
            key_name: key_name.to_string(),
            value_name: value_name.to_string(),
            drop_missing: false,
        })
    }

    /// Run every stage in order. The input is not modified.
    pub fn run(&self, input: &Table) -> TableResult<Table> {
        self.run_with_report(input).map(|(table, _)| table)
    }

    /// Like [`run`](Self::run), also returning the shape after each stage.
    pub fn run_with_report(&self, input: &Table) -> TableResult<(Table, Vec<StageReport>)> {
        let mut current = input.clone();
        let mut reports = Vec::with_capacity(self.stages.len());

        for (i, stage) in self.stages.iter().enumerate() {
            current = stage.apply(&current)?;
            tracing::debug!(
                step = i + 1,
                stage = stage.name(),
                rows = current.height(),
                columns = current.width(),
                "stage complete"
            );
            reports.push(StageReport {
                stage: stage.name(),
                rows: current.height(),
                columns: current.width(),
            });
        }

        Ok((current, reports))
    }
}

// =============================================================================
// Serialized plans
// =============================================================================

/// A pipeline described by dataset names, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePlan {
    /// Input dataset.
    pub source: String,

    #[serde(default)]
    pub stages: Vec<Stage<String>>,
}

impl PipelinePlan {
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load the source table and every join operand.
    pub fn bind(&self, provider: &dyn DatasetProvider) -> DatasetResult<(Table, Pipeline)> {
        let source = provider.load(&self.source)?;
        let stages = self
            .stages
            .iter()
            .cloned()
            .map(|stage| stage.try_map_right(|name| provider.load(&name)))
            .collect::<DatasetResult<Vec<Stage>>>()?;
        Ok((source, Pipeline { stages }))
    }

    /// Bind and run.
    pub fn execute(&self, provider: &dyn DatasetProvider) -> PipelineResult<Table> {
        self.execute_with_report(provider).map(|(table, _)| table)
    }

    pub fn execute_with_report(
        &self,
        provider: &dyn DatasetProvider,
    ) -> PipelineResult<(Table, Vec<StageReport>)> {
        let (source, pipeline) = self.bind(provider)?;
        tracing::info!(
            source = %self.source,
            stages = pipeline.len(),
            "executing plan"
        );
        Ok(pipeline.run_with_report(&source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::BundledDatasets;
    use crate::error::{DatasetError, PipelineError, SchemaError, TableError};
    use crate::models::{DataType, Schema, Value};
    use crate::transform::aggregate::Reducer;
    use crate::transform::expr::{col, lit};

    fn seasons() -> Table {
        let schema = Schema::from_pairs(&[
            ("playerID", DataType::Str),
            ("yearID", DataType::Int),
            ("HR", DataType::Int),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["p1".into(), 1.into(), 10.into()],
                vec!["p1".into(), 2.into(), 5.into()],
                vec!["p2".into(), 1.into(), 7.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_builder_runs_in_order() {
        let pipeline = Pipeline::new()
            .group_aggregate(&["playerID"], vec![Aggregation::new("HR", "HR", Reducer::Sum)])
            .sort(&["HR"], true)
            .head(1);
        let (out, report) = pipeline.run_with_report(&seasons()).unwrap();

        assert_eq!(out.row(0).unwrap(), &[Value::from("p1"), Value::Int(15)]);
        assert_eq!(
            report,
            vec![
                StageReport { stage: "group_aggregate", rows: 2, columns: 2 },
                StageReport { stage: "sort", rows: 2, columns: 2 },
                StageReport { stage: "head", rows: 1, columns: 2 },
            ]
        );
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        assert_eq!(Pipeline::new().run(&seasons()).unwrap(), seasons());
    }

    #[test]
    fn test_stage_error_stops_pipeline() {
        let err = Pipeline::new()
            .filter(col("yearID").gt(lit(1)))
            .select(&["RBI"])
            .run(&seasons())
            .unwrap_err();
        assert!(matches!(err, TableError::Schema(SchemaError::MissingColumn { .. })));
    }

    #[test]
    fn test_plan_from_json() {
        let plan = PipelinePlan::from_json(
            r#"{
                "source": "batting",
                "stages": [
                    {"stage": "left_join", "right": "people", "on": ["playerID"]},
                    {"stage": "filter", "predicate": {
                        "op": "ge",
                        "left": {"op": "col", "name": "yearID"},
                        "right": {"op": "lit", "value": 1955}}},
                    {"stage": "sort", "by": ["HR"], "descending": true},
                    {"stage": "head", "n": 3}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(plan.stages.len(), 4);
        assert_eq!(plan.stages[0].name(), "left_join");
        assert!(matches!(
            &plan.stages[0],
            Stage::LeftJoin { right, suffix, .. } if right == "people" && *suffix == JoinSuffix::default()
        ));

        let again = PipelinePlan::from_json(&plan.to_json().unwrap()).unwrap();
        assert_eq!(again, plan);
    }

    #[test]
    fn test_plan_execute() {
        let plan = PipelinePlan::from_json(
            r#"{
                "source": "batting",
                "stages": [
                    {"stage": "left_join", "right": "people", "on": ["playerID"]},
                    {"stage": "select", "columns": ["playerID", "yearID", "nameLast", "HR"]},
                    {"stage": "head", "n": 3}
                ]
            }"#,
        )
        .unwrap();

        let out = plan.execute(&BundledDatasets).unwrap();
        assert_eq!(out.column_names(), vec!["playerID", "yearID", "nameLast", "HR"]);
        assert!(out.height() <= 3);
    }

    #[test]
    fn test_plan_unknown_dataset() {
        let plan = PipelinePlan {
            source: "batting".into(),
            stages: vec![Stage::LeftJoin {
                right: "salaries".into(),
                on: vec!["playerID".into()],
                suffix: JoinSuffix::default(),
            }],
        };
        let err = plan.execute(&BundledDatasets).unwrap_err();
        assert!(matches!(err, PipelineError::Dataset(DatasetError::NotFound(ref n)) if n == "salaries"));
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let err = PipelinePlan::from_json(r#"{"source":"batting","stages":[{"stage":"explode"}]}"#);
        assert!(matches!(err, Err(PipelineError::Json(_))));
    }

    #[test]
    fn test_plan_with_empty_join_suffixes_fails() {
        let plan = PipelinePlan::from_json(
            r#"{
                "source": "batting",
                "stages": [
                    {"stage": "left_join", "right": "batting",
                     "on": ["playerID", "yearID", "stint"],
                     "suffix": {"left": "", "right": ""}}
                ]
            }"#,
        )
        .unwrap();
        let err = plan.execute(&BundledDatasets).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Table(TableError::Schema(SchemaError::InvalidSuffix { .. }))
        ));
    }

    #[test]
    fn test_plan_pivot_long_drop_missing() {
        let plan = PipelinePlan::from_json(
            r#"{
                "source": "teams",
                "stages": [
                    {"stage": "select", "columns": ["teamID", "attendance"]},
                    {"stage": "pivot_long", "id_columns": ["teamID"], "drop_missing": true}
                ]
            }"#,
        )
        .unwrap();
        let long = plan.execute(&BundledDatasets).unwrap();
        assert!(long.column("value").unwrap().iter().all(|v| !v.is_missing()));
    }
}
