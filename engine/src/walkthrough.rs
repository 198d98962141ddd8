//! Guided tour over the bundled baseball tables.
//!
//! Each step is an ordinary [`Pipeline`] run against tables from a
//! [`DatasetProvider`]; the `tour` command prints them in order.

use serde_json::Value as Json;

use crate::chart::ScatterPlot;
use crate::dataset::DatasetProvider;
use crate::error::PipelineResult;
use crate::models::Table;
use crate::transform::{col, lit, Aggregation, Assignment, Pipeline, Reducer};

/// Seasons from 1955 on with at least this many at-bats.
pub const MIN_AT_BATS: i64 = 200;
pub const FIRST_SEASON: i64 = 1955;

/// One printed step of the tour.
#[derive(Debug, Clone)]
pub struct Step {
    pub title: &'static str,
    pub description: &'static str,
    pub table: Table,
}

/// Output of [`run`]: the steps plus a scatter spec of the qualifying seasons.
#[derive(Debug, Clone)]
pub struct Walkthrough {
    pub steps: Vec<Step>,
    pub chart: Json,
}

/// Batting joined to player names, restricted to qualifying seasons, with a
/// rounded batting average.
pub fn qualifying_seasons(people: Table) -> Pipeline {
    Pipeline::new()
        .left_join(people, &["playerID"])
        .unite("name", &["nameFirst", "nameLast"], " ")
        .filter(
            col("yearID")
                .gt_eq(lit(FIRST_SEASON))
                .and(col("AB").gt_eq(lit(MIN_AT_BATS))),
        )
        .mutate(vec![Assignment::new("BA", (col("H") / col("AB")).round(3))])
        .select(&["playerID", "name", "yearID", "teamID", "lgID", "AB", "H", "HR", "BA"])
}

/// Top `n` career home run totals, with names attached.
pub fn career_home_run_leaders(people: Table, n: usize) -> Pipeline {
    Pipeline::new()
        .group_aggregate(
            &["playerID"],
            vec![
                Aggregation::new("HR", "HR", Reducer::Sum),
                Aggregation::new("seasons", "yearID", Reducer::NDistinct),
            ],
        )
        .sort(&["HR"], true)
        .head(n)
        .left_join(people, &["playerID"])
        .unite("name", &["nameFirst", "nameLast"], " ")
        .select(&["playerID", "name", "HR", "seasons"])
}

/// Home runs per season, one column per league.
pub fn league_home_runs() -> Pipeline {
    Pipeline::new()
        .group_aggregate(&["yearID", "lgID"], vec![Aggregation::new("HR", "HR", Reducer::Sum)])
        .pivot_wide(&["yearID"], "lgID", "HR")
        .sort(&["yearID"], false)
}

/// The wide league table stacked back into `(yearID, lgID, HR)` rows.
pub fn league_home_runs_long() -> Pipeline {
    Pipeline::new().pivot_long(&["yearID"], "lgID", "HR")
}

/// Power against average for the qualifying seasons, colored by league.
pub fn power_vs_average() -> ScatterPlot {
    ScatterPlot::new("HR", "BA")
        .with_color("lgID")
        .with_title("Home runs vs batting average, 1955 onward")
}

/// Run every step against `provider`.
pub fn run(provider: &dyn DatasetProvider) -> PipelineResult<Walkthrough> {
    let batting = provider.load("batting")?;
    let people = provider.load("people")?;

    let seasons = qualifying_seasons(people.clone()).run(&batting)?;
    let leaders = career_home_run_leaders(people.clone(), 5).run(&batting)?;
    let wide = league_home_runs().run(&batting)?;
    let long = league_home_runs_long().run(&wide)?;
    let chart = power_vs_average().to_vega_lite(&seasons)?;

    tracing::info!(steps = 5, "walkthrough complete");

    let steps = vec![
        Step {
            title: "Load",
            description: "The batting table as packaged, one row per player, season and stint.",
            table: batting,
        },
        Step {
            title: "Join, derive, filter",
            description: "Attach names from people, keep seasons from 1955 with 200+ at-bats, add BA = round(H / AB, 3).",
            table: seasons,
        },
        Step {
            title: "Group and summarise",
            description: "Career home runs per player, top five, joined back to names.",
            table: leaders,
        },
        Step {
            title: "Pivot wide",
            description: "Home runs per season with one column per league.",
            table: wide,
        },
        Step {
            title: "Pivot long",
            description: "The same numbers stacked back into one row per season and league.",
            table: long,
        },
    ];

    Ok(Walkthrough { steps, chart })
}
