//! iplstats - exploratory data analysis of IPL cricket data
//!
//! A CLI tool that loads match and ball-by-ball delivery records, cleans
//! and joins them, and reports a fixed set of named aggregates as
//! Markdown or JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (missing data, bad config, unwritable report)

mod analysis;
mod cleaning;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;

use analysis::Pipeline;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{CleaningStats, MissingValueProfile};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("iplstats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(&args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .iplstats.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize input paths, cleaning rules, team renames, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns the exit code.
fn run_analysis(args: &Args) -> Result<i32> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);

    // Progress and summary lines would corrupt a report written to stdout
    let to_stdout = config.report.output == "-";
    let chatty = !args.quiet && !to_stdout;

    let pipeline = Pipeline::new(config.clone());

    if chatty {
        println!("📥 Loading data:");
        println!("   Matches: {}", config.data.matches);
        println!("   Deliveries: {}", config.data.deliveries);
    }

    if args.dry_run {
        let spinner = create_spinner(chatty, "Reading CSV files...");
        let raw = pipeline.load();
        spinner.finish_and_clear();

        let cleaned = pipeline.prepare(raw.context("Failed to load input data")?);
        print_dry_run(&cleaned.stats, &cleaned.missing_values);
        return Ok(0);
    }

    let spinner = create_spinner(chatty, "Loading, cleaning and aggregating...");
    let report = pipeline.run();
    spinner.finish_and_clear();
    let report = report.context("Failed to load input data")?;

    if chatty {
        println!("\n📝 Generating report...");
    }
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    if to_stdout {
        print!("{}", output);
        return Ok(0);
    }

    std::fs::write(&config.report.output, &output)
        .with_context(|| format!("Failed to write report to {}", config.report.output))?;

    if chatty {
        let stats = &report.cleaning;
        let aggregates = &report.aggregates;
        println!("\n📊 Analysis Summary:");
        println!(
            "   Matches: {} kept of {} read",
            stats.match_rows_kept, stats.match_rows_read
        );
        println!(
            "   Deliveries: {} kept of {} read",
            stats.delivery_rows_kept, stats.delivery_rows_read
        );
        println!("   Total runs: {}", aggregates.total_runs);
        if let Some(top) = aggregates.top_scorers.first() {
            println!("   Top scorer: {} ({} runs)", top.label, top.value);
        }
        println!("   Duration: {:.1}s", report.metadata.duration_seconds);
        println!(
            "\n✅ Analysis complete! Report saved to: {}",
            config.report.output
        );
    }

    Ok(0)
}

/// Build a progress spinner; hidden when output should stay quiet.
fn create_spinner(visible: bool, message: &'static str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Handle --dry-run: print what cleaning did, no aggregation.
fn print_dry_run(stats: &CleaningStats, missing: &MissingValueProfile) {
    println!("\n🔍 Dry run: loaded and cleaned the data (no aggregation)...\n");
    println!(
        "   Matches: {} read, {} kept",
        stats.match_rows_read, stats.match_rows_kept
    );
    println!(
        "   Deliveries: {} read, {} kept",
        stats.delivery_rows_read, stats.delivery_rows_kept
    );
    println!("   Cells filled: {}", stats.cells_filled);
    println!("   Unparsed dates: {}", stats.unparsed_dates);
    println!("   Deliveries without a match: {}", stats.join_misses);

    for (relation, counts) in [("matches", &missing.matches), ("deliveries", &missing.deliveries)] {
        println!("\n   Missing values in {}:", relation);
        for (column, nulls) in counts {
            println!("     {:<20} {}", column, nulls);
        }
    }

    println!("\n✅ Dry run complete. No report was written.");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
