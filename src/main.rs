//! CLI entry point for the cleaning stage.

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use listing_cleaning::{CleaningConfig, CleaningStage, FsArtifactStore, StageReport};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Basic cleaning stage for rental-listing snapshots",
    long_about = "Downloads a raw dataset artifact, drops price outliers, normalizes the\n\
                  last_review column to a calendar date, and publishes the result as a new\n\
                  versioned artifact.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  ARTIFACT_STORE_ROOT    Artifact store directory (overridden by --store-root)\n\n\
                  EXAMPLE:\n  \
                  listing-cleaning --input_artifact sample:latest \\\n      \
                  --output_artifact clean_sample.csv --output_type clean_sample \\\n      \
                  --output_description 'Price outliers removed' \\\n      \
                  --min_price 10 --max_price 350"
)]
struct Args {
    /// Fully qualified reference to the input artifact (name, name:latest, or name:vN)
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Name for the cleaned output artifact; also the local scratch file path
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Type tag for the artifact to create
    #[arg(long = "output_type")]
    output_type: String,

    /// Description for the artifact to create
    #[arg(long = "output_description")]
    output_description: String,

    /// Minimum price of a listing, inclusive
    #[arg(long = "min_price")]
    min_price: f64,

    /// Maximum price of a listing, inclusive
    #[arg(long = "max_price")]
    max_price: f64,

    /// Artifact store root directory (defaults to $ARTIFACT_STORE_ROOT, then "artifact-store")
    #[arg(long)]
    store_root: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    let config = CleaningConfig {
        input_artifact: args.input_artifact,
        output_artifact: args.output_artifact,
        output_type: args.output_type,
        output_description: args.output_description,
        min_price: args.min_price,
        max_price: args.max_price,
    };

    let store_root = args
        .store_root
        .or_else(|| std::env::var("ARTIFACT_STORE_ROOT").ok())
        .unwrap_or_else(|| "artifact-store".to_string());

    let store = FsArtifactStore::open(&store_root)?;
    info!("Using artifact store at {}", store_root);

    let stage = CleaningStage::new(store, config);
    match stage.run() {
        Ok(report) => {
            if !args.quiet {
                print_summary(&report);
            }
            Ok(())
        }
        Err(e) => {
            error!("Cleaning run failed: {}", e);
            if e.retains_scratch() {
                error!("Local output file was retained for inspection");
            }
            Err(anyhow!("Cleaning run failed: {}", e))
        }
    }
}

/// Print a human-readable summary of the run.
///
/// Uses `println!` intentionally: this block is the primary output of the
/// command and should be visible regardless of log level settings.
fn print_summary(report: &StageReport) {
    println!();
    println!("{}", "=".repeat(60));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(60));
    println!(
        "  Rows: {} -> {} ({} dropped)",
        report.rows_before, report.rows_kept, report.rows_dropped
    );
    if report.unparseable_dates > 0 {
        println!(
            "  Review dates left null (unparseable): {}",
            report.unparseable_dates
        );
    }
    println!("  Published artifact: {}", report.artifact);
    println!("  Duration: {}ms", report.duration_ms);
    println!("{}", "=".repeat(60));
}
