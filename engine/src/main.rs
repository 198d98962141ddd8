//! Statframe CLI - explore and transform the baseball tables
//!
//! # Commands
//!
//! ```bash
//! statframe datasets                       # List available tables
//! statframe schema batting                 # Column names and types
//! statframe show people --head 5           # Print a table
//! statframe run plan.json -o out.csv -f csv   # Execute a pipeline plan
//! statframe tour                           # Guided walkthrough
//! statframe chart plan.json --x HR --y BA  # Vega-Lite scatter spec
//! ```
//!
//! Settings come from `STATFRAME_*` variables (a `.env` file is loaded if
//! present); flags override them. Logs go to stderr, filtered by `RUST_LOG`
//! or `STATFRAME_LOG`.

use clap::{Parser, Subcommand};
use statframe::{
    walkthrough, BundledDatasets, DatasetProvider, DirectoryDatasets, LayeredDatasets,
    OutputFormat, PipelinePlan, ScatterPlot, Settings, Table,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "statframe")]
#[command(about = "Join, filter, summarise and reshape baseball statistics", long_about = None)]
struct Cli {
    /// Output format (default: STATFRAME_FORMAT or table)
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Directory of extra CSV tables, searched before the bundled data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables that can be loaded
    Datasets,

    /// Show the columns and types of a table
    Schema {
        /// Table name
        name: String,
    },

    /// Print a table
    Show {
        /// Table name
        name: String,

        /// Number of rows to print (default: STATFRAME_PREVIEW_ROWS or 10)
        #[arg(long)]
        head: Option<usize>,
    },

    /// Execute a JSON pipeline plan
    Run {
        /// Plan file
        plan: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the shape of the table after each stage
        #[arg(long)]
        report: bool,
    },

    /// Walk through the sample analysis step by step
    Tour,

    /// Run a plan and emit a Vega-Lite scatter plot of the result
    Chart {
        /// Plan file
        plan: PathBuf,

        /// Column on the x axis
        #[arg(long)]
        x: String,

        /// Column on the y axis
        #[arg(long)]
        y: String,

        /// Column used for point color
        #[arg(long)]
        color: Option<String>,

        /// Chart title
        #[arg(long)]
        title: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(format) = cli.format {
        settings.format = format;
    }
    if let Some(dir) = cli.data_dir {
        settings.data_dir = Some(dir);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let provider = provider(&settings);

    let result = match cli.command {
        Commands::Datasets => cmd_datasets(&provider),
        Commands::Schema { name } => cmd_schema(&provider, &name),
        Commands::Show { name, head } => {
            cmd_show(&provider, &name, head.unwrap_or(settings.preview_rows), settings.format)
        }
        Commands::Run {
            plan,
            output,
            report,
        } => cmd_run(&provider, &plan, output.as_deref(), report, settings.format),
        Commands::Tour => cmd_tour(&provider, settings.preview_rows),
        Commands::Chart {
            plan,
            x,
            y,
            color,
            title,
            output,
        } => {
            let chart = ScatterPlot {
                x,
                y,
                color,
                title,
            };
            cmd_chart(&provider, &plan, &chart, output.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Bundled tables, with the configured data directory layered on top.
fn provider(settings: &Settings) -> LayeredDatasets {
    let mut layers = LayeredDatasets::new();
    if let Some(dir) = &settings.data_dir {
        tracing::debug!(dir = %dir.display(), "using data directory");
        layers = layers.with_layer(DirectoryDatasets::new(dir));
    }
    layers.with_layer(BundledDatasets)
}

fn cmd_datasets(provider: &dyn DatasetProvider) -> Result<(), Box<dyn std::error::Error>> {
    for name in provider.names() {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_schema(provider: &dyn DatasetProvider, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let table = provider.load(name)?;
    eprintln!("📋 {} ({} rows)", name, table.height());

    let width = table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0);
    for field in table.schema().fields() {
        println!("{:<width$}  {}", field.name, field.dtype, width = width);
    }
    Ok(())
}

fn cmd_show(
    provider: &dyn DatasetProvider,
    name: &str,
    rows: usize,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = provider.load(name)?;
    write_output(&format.render(&table.head(rows))?, None)
}

fn cmd_run(
    provider: &dyn DatasetProvider,
    plan_path: &Path,
    output: Option<&Path>,
    report: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Plan: {}", plan_path.display());

    let plan = PipelinePlan::from_json(&fs::read_to_string(plan_path)?)?;
    let (table, stages) = plan.execute_with_report(provider)?;

    if report {
        for (i, stage) in stages.iter().enumerate() {
            eprintln!("   {}. {:<16} {} x {}", i + 1, stage.stage, stage.rows, stage.columns);
        }
    }
    eprintln!("✅ {} rows, {} columns", table.height(), table.width());

    write_output(&format.render(&table)?, output)
}

fn cmd_tour(provider: &dyn DatasetProvider, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    let tour = walkthrough::run(provider)?;

    for (i, step) in tour.steps.iter().enumerate() {
        println!("## Step {}: {}", i + 1, step.title);
        println!("{}\n", step.description);
        println!("{}", preview(&step.table, rows));
    }

    println!("## Step {}: Chart", tour.steps.len() + 1);
    println!("Vega-Lite spec for HR vs BA, colored by league:\n");
    println!("{}", serde_json::to_string_pretty(&tour.chart["encoding"])?);
    Ok(())
}

fn cmd_chart(
    provider: &dyn DatasetProvider,
    plan_path: &Path,
    chart: &ScatterPlot,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let plan = PipelinePlan::from_json(&fs::read_to_string(plan_path)?)?;
    let table = plan.execute(provider)?;

    let spec = chart.to_vega_lite(&table)?;
    write_output(&serde_json::to_string_pretty(&spec)?, output)
}

fn preview(table: &Table, rows: usize) -> String {
    let mut text = table.head(rows).to_string();
    if table.height() > rows {
        text.push_str(&format!("# ... with {} more rows\n", table.height() - rows));
    }
    text
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
