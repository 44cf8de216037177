//! churnlens: churn and purchase behavior report for e-commerce customers
//!
//! This is the main entrypoint that orchestrates loading, cleaning,
//! aggregation and chart rendering.

use std::process;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use churnlens::{
    clean_dataset, generate_visualization_report, load_dataset, summarize, AnalysisError,
    AnalysisReport, Args,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);
    args.validate()?;

    if args.verbose {
        println!("churnlens - Customer Churn and Purchase Analysis");
        println!("================================================\n");
    }

    match run_pipeline(&args) {
        Err(err) if is_missing_input(&err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
        result => result,
    }
}

fn is_missing_input(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::InputNotFound(_))
    )
}

/// `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run load, clean, aggregate and render in order
fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();
    let columns = args.column_map();

    // Step 1: Load
    let data_start = Instant::now();
    let df = load_dataset(args.input_path())?;
    println!("Dataset '{}' loaded successfully.", args.input);
    debug!(elapsed_s = data_start.elapsed().as_secs_f64(), "Load finished");

    summarize(&df, args.head);

    // Step 2: Clean
    let before = df.height();
    let df = clean_dataset(df, &columns)?;
    info!(
        rows = df.height(),
        dropped = before - df.height(),
        "Cleaning complete"
    );

    // Step 3: Aggregate
    let report = AnalysisReport::build(&df, &columns, args.bins)?;

    // Step 4: Render
    let viz_start = Instant::now();
    let written = generate_visualization_report(&report, &args.chart_dir())?;
    debug!(elapsed_s = viz_start.elapsed().as_secs_f64(), "Rendering finished");

    println!("\n=== Analysis Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    for path in &written {
        println!("Chart saved to: {}", path.display());
    }

    Ok(())
}
