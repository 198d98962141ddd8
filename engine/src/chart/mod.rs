//! Scatter-plot hand-off.
//!
//! Tables are not drawn here. A [`ScatterPlot`] checks its column bindings
//! against a table and emits a self-contained Vega-Lite v5 document with
//! the rows inlined, for any Vega-Lite renderer to display.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

use crate::error::{ChartError, ChartResult};
use crate::models::{DataType, Table};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Point chart of `y` against `x`, optionally colored by a third column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScatterPlot {
    pub x: String,
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ScatterPlot {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            color: None,
            title: None,
        }
    }

    pub fn with_color(mut self, column: impl Into<String>) -> Self {
        self.color = Some(column.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Check the bindings: `x`/`y` must be numeric, `color` must exist.
    pub fn validate(&self, table: &Table) -> ChartResult<()> {
        for (channel, column) in [("x", &self.x), ("y", &self.y)] {
            let dtype = table.schema().dtype_of(column)?;
            if !dtype.is_numeric() {
                return Err(ChartError::NotNumeric {
                    channel,
                    column: column.clone(),
                    found: dtype,
                });
            }
        }
        if let Some(color) = &self.color {
            table.schema().dtype_of(color)?;
        }
        Ok(())
    }

    /// Build the Vega-Lite specification for `table`.
    pub fn to_vega_lite(&self, table: &Table) -> ChartResult<Json> {
        self.validate(table)?;

        let mut encoding = Map::new();
        encoding.insert("x".into(), channel(&self.x, DataType::Float));
        encoding.insert("y".into(), channel(&self.y, DataType::Float));
        if let Some(color) = &self.color {
            let dtype = table.schema().dtype_of(color)?;
            encoding.insert("color".into(), channel(color, dtype));
        }

        let mut spec = json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": { "values": table.to_records() },
            "mark": { "type": "point", "tooltip": true },
            "encoding": Json::Object(encoding),
        });
        if let Some(title) = &self.title {
            spec["title"] = json!(title);
        }

        tracing::debug!(x = %self.x, y = %self.y, points = table.height(), "scatter spec");
        Ok(spec)
    }
}

fn channel(field: &str, dtype: DataType) -> Json {
    let kind = if dtype.is_numeric() {
        "quantitative"
    } else {
        "nominal"
    };
    json!({ "field": field, "type": kind })
}
