//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.iplstats.toml` files.

use crate::cleaning::FieldPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".iplstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Input file locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Cleaning rules.
    #[serde(default)]
    pub cleaning: CleaningConfig,

    /// Team-name normalization.
    #[serde(default)]
    pub teams: TeamsConfig,

    /// Sizes of the ranked aggregates.
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the match records CSV.
    #[serde(default = "default_matches_path")]
    pub matches: String,

    /// Path to the ball-by-ball deliveries CSV.
    #[serde(default = "default_deliveries_path")]
    pub deliveries: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            matches: default_matches_path(),
            deliveries: default_deliveries_path(),
        }
    }
}

fn default_matches_path() -> String {
    "matches.csv".to_string()
}

fn default_deliveries_path() -> String {
    "deliveries.csv".to_string()
}

/// Cleaning rules applied before any aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Treat every delivery column present in the file as mandatory,
    /// including the wicket columns that are empty on most deliveries.
    /// Turning this off keeps non-wicket deliveries.
    #[serde(default = "default_true")]
    pub strict_deliveries: bool,

    /// Cell values read as null, in addition to empty cells.
    #[serde(default = "default_null_tokens")]
    pub null_tokens: Vec<String>,

    /// Date formats tried in order when parsing match dates.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// Per-column policies for the match relation.
    #[serde(default = "default_match_policies")]
    pub matches: BTreeMap<String, FieldPolicy>,

    /// Per-column policies for the delivery relation.
    #[serde(default = "default_delivery_policies")]
    pub deliveries: BTreeMap<String, FieldPolicy>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            strict_deliveries: true,
            null_tokens: default_null_tokens(),
            date_formats: default_date_formats(),
            matches: default_match_policies(),
            deliveries: default_delivery_policies(),
        }
    }
}

fn default_null_tokens() -> Vec<String> {
    vec!["NA", "N/A", "NaN", "nan", "null", "NULL", "None"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_date_formats() -> Vec<String> {
    // Day-first; two-digit years before four so "18/04/08" is not year 8
    vec!["%Y-%m-%d", "%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_match_policies() -> BTreeMap<String, FieldPolicy> {
    let mut policies = BTreeMap::new();
    policies.insert(
        "player_of_match".to_string(),
        FieldPolicy::Fill {
            value: "Unknown".to_string(),
        },
    );
    policies
}

fn default_delivery_policies() -> BTreeMap<String, FieldPolicy> {
    [
        "match_id",
        "over",
        "batting_team",
        "bowling_team",
        "batsman",
        "bowler",
        "batsman_runs",
        "total_runs",
    ]
    .into_iter()
    .map(|column| (column.to_string(), FieldPolicy::DropRow))
    .chain(
        ["player_dismissed", "dismissal_kind"]
            .into_iter()
            .map(|column| (column.to_string(), FieldPolicy::KeepNull)),
    )
    .collect()
}

/// Team-name normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamsConfig {
    /// Old franchise name to current name.
    #[serde(default = "default_team_renames")]
    pub renames: BTreeMap<String, String>,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            renames: default_team_renames(),
        }
    }
}

fn default_team_renames() -> BTreeMap<String, String> {
    [
        ("Delhi Daredevils", "Delhi Capitals"),
        ("Kings XI Punjab", "Punjab Kings"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// Sizes of the ranked aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_top_five")]
    pub top_scorers: usize,

    #[serde(default = "default_top_five")]
    pub top_wicket_takers: usize,

    #[serde(default = "default_top_ten")]
    pub venues: usize,

    #[serde(default = "default_top_ten")]
    pub team_averages: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_scorers: default_top_five(),
            top_wicket_takers: default_top_five(),
            venues: default_top_ten(),
            team_averages: default_top_ten(),
        }
    }
}

fn default_top_five() -> usize {
    5
}

fn default_top_ten() -> usize {
    10
}

/// Report generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Maximum rows printed per table in the Markdown report.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Decimal places for averages in the Markdown report.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Include the missing-value profile section.
    #[serde(default = "default_true")]
    pub include_missing_values: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            max_rows: default_max_rows(),
            precision: default_precision(),
            include_missing_values: true,
        }
    }
}

fn default_output() -> String {
    "ipl_report.md".to_string()
}

fn default_max_rows() -> usize {
    20
}

fn default_precision() -> usize {
    2
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref matches) = args.matches {
            self.data.matches = matches.display().to_string();
        }
        if let Some(ref deliveries) = args.deliveries {
            self.data.deliveries = deliveries.display().to_string();
        }

        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }

        // One size for every ranking
        if let Some(top) = args.top {
            self.ranking.top_scorers = top;
            self.ranking.top_wicket_takers = top;
            self.ranking.venues = top;
            self.ranking.team_averages = top;
        }

        if args.lenient {
            self.cleaning.strict_deliveries = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.matches, "matches.csv");
        assert_eq!(config.ranking.top_scorers, 5);
        assert_eq!(config.ranking.venues, 10);
        assert_eq!(
            config.teams.renames.get("Kings XI Punjab").map(String::as_str),
            Some("Punjab Kings")
        );
        assert!(config.cleaning.strict_deliveries);
        assert_eq!(
            config.cleaning.deliveries.get("dismissal_kind"),
            Some(&FieldPolicy::KeepNull)
        );
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[data]
matches = "data/ipl_matches.csv"

[cleaning]
strict_deliveries = false

[cleaning.matches]
player_of_match = { action = "fill", value = "N/A" }
city = { action = "drop_row" }

[teams.renames]
"Deccan Chargers" = "Sunrisers Hyderabad"

[ranking]
top_scorers = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.data.matches, "data/ipl_matches.csv");
        assert_eq!(config.data.deliveries, "deliveries.csv");
        assert!(!config.cleaning.strict_deliveries);
        assert_eq!(
            config.cleaning.matches.get("player_of_match"),
            Some(&FieldPolicy::Fill {
                value: "N/A".to_string()
            })
        );
        assert_eq!(
            config.cleaning.matches.get("city"),
            Some(&FieldPolicy::DropRow)
        );
        // Unset sections keep their defaults
        assert_eq!(
            config.cleaning.deliveries.get("total_runs"),
            Some(&FieldPolicy::DropRow)
        );
        assert_eq!(config.teams.renames.len(), 1);
        assert_eq!(config.ranking.top_scorers, 3);
        assert_eq!(config.ranking.top_wicket_takers, 5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[cleaning]"));
        assert!(toml_str.contains("[ranking]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed, Config::default());
    }
}
