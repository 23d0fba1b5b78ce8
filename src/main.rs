//! segscore: score customers against precomputed marketing segments
//!
//! Loads the reference data once, then either scores a single profile or
//! prints the segment summary.

use anyhow::Result;
use clap::Parser;
use segscore::{load_reference_data, report, score_input, AppConfig, Args, ReferenceData, Scoring};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let level = if args.verbose { "segscore=debug" } else { "segscore=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(&args.config)?;
    args.apply_overrides(&mut config)?;
    debug!(?config, "Effective configuration");

    let start_time = Instant::now();
    let data = load_reference_data(
        &config.data.clustering_csv,
        &config.data.campaign_csv,
        config.data.campaign_separator as u8,
    )?;
    info!(
        "Reference data loaded in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    // Check if in prediction mode
    if let Some(input) = args.parse_profile_values()? {
        run_prediction_mode(&args, &config, &data, input)?;
    } else {
        run_summary_mode(&args, &config, &data)?;
    }

    Ok(())
}

/// Score a single customer profile
fn run_prediction_mode(
    args: &Args,
    config: &AppConfig,
    data: &ReferenceData,
    input: segscore::ProfileInput,
) -> Result<()> {
    let outcome = score_input(&input, &data.tables, &config.scoring)?;
    let profile = input.validate().ok();

    match outcome {
        Scoring::Scored(ref result) => info!(
            cluster = result.cluster_id,
            probability = result.response_probability,
            strategy = ?result.strategy,
            "Customer scored"
        ),
        Scoring::InsufficientInput { missing } => {
            info!(%missing, "Insufficient input, nothing scored")
        }
    }

    if args.json {
        println!(
            "{}",
            report::scoring_json(&outcome, profile.as_ref(), data, config)?
        );
    } else {
        println!("=== Prediction ===");
        print!(
            "{}",
            report::render_scoring(&outcome, profile.as_ref(), data, config)
        );
        println!();
    }

    Ok(())
}

/// Print the segment summary table
fn run_summary_mode(args: &Args, config: &AppConfig, data: &ReferenceData) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&data.summaries)?);
    } else {
        print!("{}", report::render_segment_summary(data, config));
    }
    Ok(())
}
