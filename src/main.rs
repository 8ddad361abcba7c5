//! ValueForge: customer value segmentation CLI
//!
//! Loads a customer table, segments it with the chosen strategy and prints
//! the assignment table. With `--predict` a new customer is classified
//! against the fitted clustering.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use valueforge::{
    assignments_to_frame, load_customers_csv, segment_table, Args, ClusterSegmenter,
    CustomerRecord, FittedSegmentation, QuantileSegmenter, Segmenter, Strategy,
};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    args.validate()?;

    if let Some(values) = args.parse_predict_values()? {
        run_prediction_mode(&args, values)
    } else {
        run_full_pipeline(&args)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Classify a single new customer against the clustering of the input table
fn run_prediction_mode(args: &Args, (orders, spend): (i64, f64)) -> Result<()> {
    println!("=== Prediction Mode ===");
    println!("Input values: orders={}, spend={}", orders, spend);

    let start_time = Instant::now();
    let table = load_customers_csv(&args.input)
        .with_context(|| format!("failed to load customers from {}", args.input))?;
    let records = table.records()?;

    let segmenter = ClusterSegmenter::new(args.cluster_config())?;
    let fitted = segmenter
        .fit(&records)?
        .context("cannot classify against an empty customer table")?;

    let assignment = fitted.classify(&CustomerRecord::new("new", Some(orders), Some(spend)))?;
    println!("\n✓ Predicted segment: {} (cluster {})", assignment.segment, assignment.cluster_id);
    println!("  Segment score: {:.3}", assignment.segment_score);
    println!("  Processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    let centroid = fitted.model.centroids.row(assignment.cluster_id);
    println!(
        "  Centroid (standardized): orders={:.2}, spend={:.2}",
        centroid[0], centroid[1]
    );

    Ok(())
}

/// Segment the whole input table and print it
fn run_full_pipeline(args: &Args) -> Result<()> {
    println!("=== Segmentation Pipeline ===\n");
    let start_time = Instant::now();

    let table = load_customers_csv(&args.input)
        .with_context(|| format!("failed to load customers from {}", args.input))?;
    println!("✓ Data loaded: {} customers", table.height());

    match args.strategy {
        Strategy::Cluster => {
            let segmenter = ClusterSegmenter::new(args.cluster_config())?;
            let fitted = segmenter.fit(&table.records()?)?;
            let assignments = fitted.as_ref().map(|f| f.assignments.as_slice()).unwrap_or_default();

            println!("✓ Segmented with `{}` strategy\n", segmenter.name());
            println!("{}", assignments_to_frame(assignments)?);

            if let (true, Some(fitted)) = (args.verbose, &fitted) {
                print_cluster_diagnostics(fitted);
            }
        }
        Strategy::Quantile => {
            let segmenter = QuantileSegmenter::new(args.quantile_config())?;
            let output = segment_table(&table, &segmenter)?;
            println!("✓ Segmented with `{}` strategy\n", segmenter.name());
            println!("{}", output);
        }
    }

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

fn print_cluster_diagnostics(fitted: &FittedSegmentation) {
    let total = fitted.assignments.len();

    println!("\n=== Cluster Statistics ===");
    for (segment, size) in fitted.segment_sizes() {
        let percentage = size as f64 / total as f64 * 100.0;
        println!("{}: {} customers ({:.1}%)", segment, size, percentage);
    }

    let silhouette = fitted
        .model
        .compute_silhouette_sample(&fitted.features, 100.min(total));
    println!("\nSilhouette score (sample): {:.3}", silhouette);
    println!("Within-cluster sum of squares: {:.2}", fitted.model.inertia);
    println!(
        "Iterations: {} (converged: {})",
        fitted.model.n_iterations, fitted.model.converged
    );
}
