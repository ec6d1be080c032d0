//! reportfill CLI - resolve report fields and fill templates

mod sidecar;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use reportfill::prelude::*;
use reportfill::{
    load_records, load_settings, parse_date_text, template_variables, CsvDataset, PassStats,
};
use serde_json::json;
use sidecar::SidecarRenderer;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reportfill")]
#[command(
    author,
    version,
    about = "Resolve report fields over a dataset and fill templates"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all fields and print them as JSON (charts stay pending)
    Preview {
        #[command(flatten)]
        data: DataArgs,

        /// Field settings file
        #[arg(short, long)]
        settings: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Resolve all fields, draw charts and fill a template
    Render {
        #[command(flatten)]
        data: DataArgs,

        /// Field settings file
        #[arg(short, long)]
        settings: PathBuf,

        /// Text template with {{ name }} placeholders
        #[arg(short, long)]
        template: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for chart descriptions
        #[arg(long, default_value = "charts")]
        charts_dir: PathBuf,
    },

    /// Print the evaluation order of the fields in a settings file
    Order {
        /// Field settings file
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// List the placeholder names used by a template
    Variables {
        /// Text template
        template: PathBuf,
    },

    /// Write the rows of a CSV file within a date range
    Filter {
        #[command(flatten)]
        data: DataArgs,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Where the dataset comes from
#[derive(Args)]
struct DataArgs {
    /// CSV dataset
    #[arg(short, long, conflicts_with = "records", required_unless_present = "records")]
    data: Option<PathBuf>,

    /// JSON array of row objects
    #[arg(long)]
    records: Option<PathBuf>,

    /// First date to keep (inclusive), on the CSV date column
    #[arg(long)]
    from: Option<String>,

    /// Last date to keep (inclusive), on the CSV date column
    #[arg(long)]
    to: Option<String>,

    /// CSV field delimiter (default: comma)
    #[arg(long, default_value = ",")]
    delimiter: char,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preview {
            data,
            settings,
            pretty,
        } => preview(&data, &settings, pretty),
        Commands::Render {
            data,
            settings,
            template,
            output,
            charts_dir,
        } => render(&data, &settings, &template, output.as_deref(), &charts_dir),
        Commands::Order { settings } => show_order(&settings),
        Commands::Variables { template } => list_variables(&template),
        Commands::Filter { data, output } => filter(&data, output.as_deref()),
    }
}

fn preview(data: &DataArgs, settings: &Path, pretty: bool) -> Result<()> {
    let dataset = load_dataset(data)?;
    let mut fields = read_settings(settings)?;
    add_date_range_fields(&mut fields, data);

    let outcome = dataset.preview(&fields).context("Evaluation failed")?;

    let report = json!({
        "order": outcome.order,
        "fields": outcome.context,
        "warnings": outcome.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
        "charts": outcome.chart_requests.iter().map(|r| json!({
            "field": r.field,
            "chart_type": r.chart_type.as_str(),
            "x_column": r.x_column,
            "y_column": r.y_column,
            "title": r.title,
        })).collect::<Vec<_>>(),
    });
    let text = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", text);

    print_stats(&outcome.stats);
    Ok(())
}

fn render(
    data: &DataArgs,
    settings: &Path,
    template_path: &Path,
    output: Option<&Path>,
    charts_dir: &Path,
) -> Result<()> {
    let dataset = load_dataset(data)?;
    let mut fields = read_settings(settings)?;
    add_date_range_fields(&mut fields, data);
    let template = TextTemplate::load(template_path)
        .with_context(|| format!("Failed to read template '{}'", template_path.display()))?;

    let mut renderer = SidecarRenderer::new(charts_dir);
    let outcome = dataset
        .render(&fields, &mut renderer)
        .context("Evaluation failed")?;
    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }

    let document = render_document(&template, &outcome.context).context("Failed to fill template")?;
    write_output(output, document.as_bytes())?;

    print_stats(&outcome.stats);
    Ok(())
}

fn show_order(settings: &Path) -> Result<()> {
    let fields = read_settings(settings)?;
    let schedule = fields.build_graph().graph.schedule();

    for (i, name) in schedule.order.iter().enumerate() {
        let kind = fields.get(name).map(|f| f.kind.as_str()).unwrap_or("?");
        println!("{}\t{}\t{}", i + 1, name, kind);
    }
    for warning in &schedule.cycles {
        eprintln!("Warning: {}", warning);
    }
    Ok(())
}

fn list_variables(template: &Path) -> Result<()> {
    let text = fs::read_to_string(template)
        .with_context(|| format!("Failed to read template '{}'", template.display()))?;
    for name in template_variables(&text) {
        println!("{}", name);
    }
    Ok(())
}

fn filter(data: &DataArgs, output: Option<&Path>) -> Result<()> {
    if data.data.is_none() {
        bail!("filter needs a CSV dataset (--data)");
    }
    let dataset = load_dataset(data)?;

    let options = CsvWriteOptions {
        delimiter: delimiter_byte(data.delimiter)?,
        ..Default::default()
    };
    let mut out = Vec::new();
    CsvWriter::write(&dataset, &mut out, &options).context("Failed to write CSV")?;
    write_output(output, &out)?;

    eprintln!("Kept {} rows", dataset.row_count());
    Ok(())
}

/// Load the dataset named by the data arguments, applying any date range
fn load_dataset(args: &DataArgs) -> Result<Dataset> {
    if let Some(path) = &args.records {
        if args.from.is_some() || args.to.is_some() {
            bail!("--from/--to need a CSV dataset with a date column");
        }
        return load_records(path)
            .with_context(|| format!("Failed to read records '{}'", path.display()));
    }

    let Some(path) = &args.data else {
        bail!("no dataset given: use --data or --records");
    };
    let options = CsvReadOptions {
        delimiter: delimiter_byte(args.delimiter)?,
        ..Default::default()
    };
    let CsvDataset {
        dataset,
        date_column,
    } = CsvDatasetReader::read_file(path, &options)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;

    if args.from.is_none() && args.to.is_none() {
        return Ok(dataset);
    }

    let date_column = date_column
        .with_context(|| format!("'{}' has no date column to filter on", path.display()))?;
    let parse = |text: &str| parse_date_text(text).with_context(|| format!("Invalid date '{}'", text));
    let start = args.from.as_deref().map(parse).transpose()?;
    let end = args.to.as_deref().map(parse).transpose()?;

    let filtered = dataset.filter_date_range(&date_column.name, start, end)?;
    tracing::info!(
        column = %date_column.name,
        kept = filtered.row_count(),
        total = dataset.row_count(),
        "filtered by date"
    );
    Ok(filtered)
}

/// Expose the requested date range as `start_date`/`end_date` unless the settings define them
fn add_date_range_fields(fields: &mut FieldSet, args: &DataArgs) {
    for (name, value) in [("start_date", &args.from), ("end_date", &args.to)] {
        if let Some(value) = value {
            if !fields.contains(name) {
                fields.insert(Field::fixed(name, value.as_str()));
            }
        }
    }
}

fn read_settings(path: &Path) -> Result<FieldSet> {
    let fields =
        load_settings(path).with_context(|| format!("Failed to load settings '{}'", path.display()))?;
    if fields.is_empty() {
        eprintln!("Warning: no fields defined in '{}'", path.display());
    }
    Ok(fields)
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }
    Ok(delimiter as u8)
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))?;
            eprintln!("Wrote '{}'", path.display());
        }
        None => io::stdout()
            .write_all(bytes)
            .context("Failed to write to stdout")?,
    }
    Ok(())
}

fn print_stats(stats: &PassStats) {
    eprintln!(
        "Resolved {} fields ({} errors, {} cycles, {} charts)",
        stats.fields, stats.errors, stats.cycles, stats.charts_requested
    );
}
