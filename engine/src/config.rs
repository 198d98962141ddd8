//! Runtime settings, read from the environment (and `.env` via dotenvy).
//!
//! | Variable                 | Default | Meaning                                   |
//! |--------------------------|---------|-------------------------------------------|
//! | `STATFRAME_DATA_DIR`     | unset   | directory of extra CSV tables             |
//! | `STATFRAME_FORMAT`       | `table` | output format: `table`, `json`, `csv`     |
//! | `STATFRAME_PREVIEW_ROWS` | `10`    | rows printed by `show` and `tour`         |
//! | `STATFRAME_LOG`          | `info`  | tracing filter when `RUST_LOG` is unset   |

use clap::ValueEnum;
use std::path::PathBuf;

use crate::error::PipelineResult;
use crate::models::Table;
use crate::parser::write_csv;

pub const DATA_DIR_VAR: &str = "STATFRAME_DATA_DIR";
pub const FORMAT_VAR: &str = "STATFRAME_FORMAT";
pub const PREVIEW_ROWS_VAR: &str = "STATFRAME_PREVIEW_ROWS";
pub const LOG_VAR: &str = "STATFRAME_LOG";

const DEFAULT_PREVIEW_ROWS: usize = 10;
const DEFAULT_LOG_FILTER: &str = "info";

/// How tables are written to stdout or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text grid.
    #[default]
    Table,
    /// JSON array of row objects.
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

impl OutputFormat {
    /// Render a table in this format.
    pub fn render(self, table: &Table) -> PipelineResult<String> {
        match self {
            OutputFormat::Table => Ok(table.to_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&table.to_records())?),
            OutputFormat::Csv => {
                let mut buf = Vec::new();
                write_csv(table, &mut buf)?;
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    }
}

/// Settings shared by the CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: Option<PathBuf>,
    pub format: OutputFormat,
    pub preview_rows: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            format: OutputFormat::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Unparseable values fall back to the
    /// default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let format = match get(FORMAT_VAR) {
            Some(raw) => OutputFormat::from_str(&raw, true).unwrap_or_else(|_| {
                tracing::warn!(variable = FORMAT_VAR, value = %raw, "unknown output format, using table");
                defaults.format
            }),
            None => defaults.format,
        };

        let preview_rows = match get(PREVIEW_ROWS_VAR) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(variable = PREVIEW_ROWS_VAR, value = %raw, "not a row count, using default");
                defaults.preview_rows
            }),
            None => defaults.preview_rows,
        };

        Self {
            data_dir: get(DATA_DIR_VAR).map(PathBuf::from),
            format,
            preview_rows,
            log_filter: get(LOG_VAR).unwrap_or(defaults.log_filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Schema};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Settings::from_lookup(lookup(&[])), Settings::default());
    }

    #[test]
    fn test_from_lookup() {
        let settings = Settings::from_lookup(lookup(&[
            (DATA_DIR_VAR, "/srv/lahman"),
            (FORMAT_VAR, "JSON"),
            (PREVIEW_ROWS_VAR, "25"),
            (LOG_VAR, "statframe=debug"),
        ]));
        assert_eq!(settings.data_dir, Some(PathBuf::from("/srv/lahman")));
        assert_eq!(settings.format, OutputFormat::Json);
        assert_eq!(settings.preview_rows, 25);
        assert_eq!(settings.log_filter, "statframe=debug");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            (FORMAT_VAR, "xml"),
            (PREVIEW_ROWS_VAR, "many"),
            (DATA_DIR_VAR, "  "),
        ]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_render_formats() {
        let schema = Schema::from_pairs(&[("playerID", DataType::Str), ("HR", DataType::Int)]).unwrap();
        let table = Table::new(schema, vec![vec!["marisro01".into(), 61.into()]]).unwrap();

        assert_eq!(OutputFormat::Csv.render(&table).unwrap(), "playerID,HR\nmarisro01,61\n");

        let json: serde_json::Value =
            serde_json::from_str(&OutputFormat::Json.render(&table).unwrap()).unwrap();
        assert_eq!(json[0]["HR"], 61);

        let text = OutputFormat::Table.render(&table).unwrap();
        assert!(text.starts_with("# 1 x 2"));
    }
}
