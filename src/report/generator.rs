//! Markdown and JSON report generation.
//!
//! Both formats are built from the named tables of an [`AnalysisReport`],
//! so every aggregate the pipeline computes shows up in either output.

use crate::analysis::{Aggregate, Table};
use crate::config::ReportConfig;
use crate::models::{
    Aggregates, AnalysisReport, CleaningStats, MissingValueProfile, ReportMetadata,
};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport, settings: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# IPL Exploratory Data Analysis\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_cleaning_section(&report.cleaning));

    if settings.include_missing_values {
        output.push_str(&generate_missing_values_section(&report.missing_values));
    }

    output.push_str(&generate_headline_section(&report.aggregates));

    let tables = report.tables();
    for (name, title) in section_titles(&report.aggregates) {
        if let Some(Aggregate::Table(table)) = tables.get(name) {
            output.push_str(&format!("## {}\n\n", title));
            output.push_str(&render_table(table, settings.max_rows, settings.precision));
        }
    }

    output.push_str(&generate_outlier_section(&tables, settings));

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Section headings for the tabular aggregates, in report order.
fn section_titles(aggregates: &Aggregates) -> Vec<(&'static str, String)> {
    vec![
        (
            "top_scorers",
            format!("Top {} Run Scorers", aggregates.top_scorers.len()),
        ),
        ("runs_per_over", "Average Runs per Over".to_string()),
        (
            "top_wicket_takers",
            format!("Top {} Wicket Takers", aggregates.top_wicket_takers.len()),
        ),
        ("team_runs", "Total Runs by Each Team".to_string()),
        ("win_distribution", "Win Distribution by Teams".to_string()),
        ("toss_vs_win", "Toss Decision vs Match Winner".to_string()),
        (
            "venue_counts",
            format!("Top {} Stadiums", aggregates.venue_counts.len()),
        ),
        ("avg_runs_per_team", "Average Runs per Team".to_string()),
        ("matches_per_year", "Year-wise Match Count".to_string()),
        (
            "avg_runs_heatmap",
            "Average Runs per Over by Batting Team".to_string(),
        ),
        ("runs_per_match", "Total Runs per Match".to_string()),
    ]
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Matches:** `{}`\n", metadata.matches_source));
    section.push_str(&format!(
        "- **Deliveries:** `{}`\n",
        metadata.deliveries_source
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the cleaning summary.
fn generate_cleaning_section(stats: &CleaningStats) -> String {
    let mut section = String::new();

    section.push_str("## Data Cleaning\n\n");
    section.push_str("| Relation | Rows Read | Rows Kept |\n");
    section.push_str("|:---|---:|---:|\n");
    section.push_str(&format!(
        "| matches | {} | {} |\n",
        stats.match_rows_read, stats.match_rows_kept
    ));
    section.push_str(&format!(
        "| deliveries | {} | {} |\n\n",
        stats.delivery_rows_read, stats.delivery_rows_kept
    ));

    section.push_str(&format!("- **Cells filled:** {}\n", stats.cells_filled));
    if stats.unparsed_dates > 0 {
        section.push_str(&format!(
            "- **Unparsed match dates:** {}\n",
            stats.unparsed_dates
        ));
    }
    if stats.join_misses > 0 {
        section.push_str(&format!(
            "- **Deliveries without a match:** {}\n",
            stats.join_misses
        ));
    }
    section.push('\n');

    section
}

/// Generate the missing-value profile.
fn generate_missing_values_section(profile: &MissingValueProfile) -> String {
    let mut section = String::new();

    section.push_str("## Missing Values\n\n");
    for (relation, counts) in [("matches", &profile.matches), ("deliveries", &profile.deliveries)] {
        section.push_str(&format!("### {}\n\n", relation));
        section.push_str("| Column | Missing |\n");
        section.push_str("|:---|---:|\n");
        for (column, nulls) in counts {
            section.push_str(&format!("| {} | {} |\n", column, nulls));
        }
        section.push('\n');
    }

    section
}

/// Generate the headline numbers.
fn generate_headline_section(aggregates: &Aggregates) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str(&format!(
        "- **Total Matches:** {}\n",
        aggregates.total_matches
    ));
    section.push_str(&format!("- **Total Runs:** {}\n\n", aggregates.total_runs));

    section
}

/// Generate the outlier section: fences first, then the flagged deliveries.
fn generate_outlier_section(tables: &BTreeMap<&str, Aggregate>, settings: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str("## Outliers in Total Runs per Delivery\n\n");
    if let Some(Aggregate::Table(bounds)) = tables.get("outlier_bounds") {
        section.push_str(&render_table(bounds, settings.max_rows, settings.precision));
    }
    if let Some(Aggregate::Table(flagged)) = tables.get("outliers") {
        section.push_str(&format!(
            "{} deliveries fall outside the fences.\n\n",
            flagged.rows.len()
        ));
        if !flagged.rows.is_empty() {
            section.push_str(&render_table(flagged, settings.max_rows, settings.precision));
        }
    }

    section
}

/// Render a table as Markdown, keeping at most `max_rows` rows.
fn render_table(table: &Table, max_rows: usize, precision: usize) -> String {
    if table.rows.is_empty() {
        return "_No data._\n\n".to_string();
    }

    let mut out = String::new();

    out.push_str(&format!("| {} |\n", table.columns.join(" | ")));
    let rule: Vec<&str> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, _)| if i == 0 { ":---" } else { "---:" })
        .collect();
    out.push_str(&format!("|{}|\n", rule.join("|")));

    for row in table.rows.iter().take(max_rows) {
        let cells: Vec<String> = row.iter().map(|c| c.display(precision)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    if table.rows.len() > max_rows {
        out.push_str(&format!(
            "\n*... {} more rows not shown*\n",
            table.rows.len() - max_rows
        ));
    }
    out.push('\n');

    out
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by iplstats v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a ReportMetadata,
    cleaning: &'a CleaningStats,
    missing_values: &'a MissingValueProfile,
    aggregates: BTreeMap<&'static str, Aggregate>,
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    let json = JsonReport {
        metadata: &report.metadata,
        cleaning: &report.cleaning,
        missing_values: &report.missing_values,
        aggregates: report.tables(),
    };
    serde_json::to_string_pretty(&json).map_err(Into::into)
}
