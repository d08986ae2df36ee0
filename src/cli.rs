//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// iplstats - exploratory analysis of IPL match and ball-by-ball data
///
/// Loads the match and delivery CSV files, cleans and joins them, and
/// writes every aggregate as a Markdown or JSON report.
///
/// Examples:
///   iplstats
///   iplstats --matches data/matches.csv --deliveries data/deliveries.csv
///   iplstats --format json -o -
///   iplstats --top 10 --lenient
///   iplstats --dry-run
///   iplstats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Match records CSV
    ///
    /// Defaults to `matches.csv`, or the `[data]` section of the config file.
    #[arg(long, value_name = "FILE", env = "IPLSTATS_MATCHES")]
    pub matches: Option<PathBuf>,

    /// Ball-by-ball deliveries CSV
    ///
    /// Defaults to `deliveries.csv`, or the `[data]` section of the config file.
    #[arg(long, value_name = "FILE", env = "IPLSTATS_DELIVERIES")]
    pub deliveries: Option<PathBuf>,

    /// Output file path for the report (`-` for stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Number of entries in every ranked table
    ///
    /// Overrides top scorers, wicket takers, venues and team averages.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Keep deliveries whose only missing values are optional columns
    ///
    /// By default a delivery with any missing value is dropped, which keeps
    /// only wicket deliveries. With this flag the dismissal columns, inning,
    /// ball and extra runs may stay empty.
    #[arg(long)]
    pub lenient: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .iplstats.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and clean the data without computing aggregates
    ///
    /// Prints row counts and the missing-value profile, then exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .iplstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        for (flag, path) in [("--matches", &self.matches), ("--deliveries", &self.deliveries)] {
            if let Some(path) = path {
                if path.is_dir() {
                    return Err(format!("{} is a directory: {}", flag, path.display()));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
