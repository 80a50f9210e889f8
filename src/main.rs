use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pier_takeoff::pipeline;
use pier_takeoff::template::TemplateLayout;
use pier_takeoff::{Result, ToolError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Summary(args) => execute_summary(args),
        Command::Populate(args) => execute_populate(args),
    }
}

fn execute_summary(args: SummaryArgs) -> Result<()> {
    let summary = pipeline::summarize_takeoff(&args.input)?;

    println!("=== Pier Metrics Summary ===");
    for metrics in summary.sorted_metrics() {
        println!("{metrics}");
    }
    print_advisories(summary.advisories.iter());

    if let Some(path) = &args.json {
        pipeline::write_metrics_json(path, &summary.metrics)?;
    }
    if let Some(path) = &args.xlsx {
        pipeline::write_metrics_workbook(path, &summary.metrics)?;
    }
    Ok(())
}

fn execute_populate(args: PopulateArgs) -> Result<()> {
    let layout = match &args.config {
        Some(path) => TemplateLayout::from_path(path)?,
        None => TemplateLayout::default(),
    };

    let report = pipeline::populate_estimate(&args.input, &args.template, &args.output, &layout)?;

    for (tier, title) in &report.population.sheets {
        println!("{tier} -> sheet '{title}'");
    }
    println!(
        "{} condition(s) written, {} cell(s) filled",
        report.population.conditions_written, report.population.cells_written
    );
    print_advisories(report.advisories.iter());
    println!("Saved completed estimate: {}", args.output.display());

    if let Some(path) = &args.report {
        let json_string = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json_string)?;
    }
    Ok(())
}

fn print_advisories<'a>(advisories: impl Iterator<Item = &'a pier_takeoff::Advisory>) {
    for advisory in advisories {
        println!("[WARN] {advisory}");
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Aggregate drilled pier takeoffs and fill the estimating template."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the per-condition pier metrics of a takeoff export.
    Summary(SummaryArgs),
    /// Write the pier metrics into a copy of the estimating template.
    Populate(PopulateArgs),
}

#[derive(clap::Args)]
struct SummaryArgs {
    /// Takeoff export (.xlsx or .xlsm).
    #[arg(long)]
    input: PathBuf,

    /// Also write the metrics as JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Also write the metrics as a workbook table to this path.
    #[arg(long)]
    xlsx: Option<PathBuf>,
}

#[derive(clap::Args)]
struct PopulateArgs {
    /// Takeoff export (.xlsx or .xlsm).
    #[arg(long)]
    input: PathBuf,

    /// Estimating template workbook.
    #[arg(long)]
    template: PathBuf,

    /// Output workbook path. Macros survive only for .xlsm template and output.
    #[arg(long)]
    output: PathBuf,

    /// Optional JSON file overriding the template layout and row labels.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the run report (sheets, counts, advisories) as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}
