//! Data models for the match analysis.
//!
//! This module contains the record types for both input relations
//! and the typed results produced by the aggregation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage kind of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text, kept as-is after trimming.
    Text,
    /// Whole number; unparseable cells become null.
    Integer,
    /// Calendar date, parsed during cleaning.
    Date,
}

/// A column expected in one of the input files.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Canonical column name.
    pub name: &'static str,
    /// Alternative header spellings accepted for this column.
    pub aliases: &'static [&'static str],
    pub kind: ColumnKind,
    /// Whether the header must be present in the file.
    pub required: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, kind: ColumnKind, required: bool) -> Self {
        Self {
            name,
            aliases: &[],
            kind,
            required,
        }
    }

    const fn with_aliases(self, aliases: &'static [&'static str]) -> Self {
        Self { aliases, ..self }
    }

    /// Returns true if `header` names this column.
    pub fn matches_header(&self, header: &str) -> bool {
        header.eq_ignore_ascii_case(self.name)
            || self.aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
    }
}

/// Which of the two input relations a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Matches,
    Deliveries,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Matches => write!(f, "matches"),
            Relation::Deliveries => write!(f, "deliveries"),
        }
    }
}

impl Relation {
    /// Columns read from the file for this relation, in storage order.
    pub fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Relation::Matches => MATCH_COLUMNS,
            Relation::Deliveries => DELIVERY_COLUMNS,
        }
    }

    /// Position of a column in the storage order, if the relation has it.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| c.name == name)
    }
}

pub const MATCH_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("id", ColumnKind::Integer, true).with_aliases(&["match_id"]),
    ColumnSpec::new("season", ColumnKind::Text, false),
    ColumnSpec::new("city", ColumnKind::Text, false),
    ColumnSpec::new("date", ColumnKind::Date, true),
    ColumnSpec::new("team1", ColumnKind::Text, true),
    ColumnSpec::new("team2", ColumnKind::Text, true),
    ColumnSpec::new("toss_winner", ColumnKind::Text, false),
    ColumnSpec::new("toss_decision", ColumnKind::Text, true),
    ColumnSpec::new("result", ColumnKind::Text, false),
    ColumnSpec::new("winner", ColumnKind::Text, true),
    ColumnSpec::new("player_of_match", ColumnKind::Text, true),
    ColumnSpec::new("venue", ColumnKind::Text, true),
];

pub const DELIVERY_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("match_id", ColumnKind::Integer, true),
    ColumnSpec::new("inning", ColumnKind::Integer, false),
    ColumnSpec::new("over", ColumnKind::Integer, true),
    ColumnSpec::new("ball", ColumnKind::Integer, false),
    ColumnSpec::new("batting_team", ColumnKind::Text, true),
    ColumnSpec::new("bowling_team", ColumnKind::Text, true),
    ColumnSpec::new("batsman", ColumnKind::Text, true).with_aliases(&["batter"]),
    ColumnSpec::new("bowler", ColumnKind::Text, true),
    ColumnSpec::new("batsman_runs", ColumnKind::Integer, true).with_aliases(&["batter_runs"]),
    ColumnSpec::new("extra_runs", ColumnKind::Integer, false),
    ColumnSpec::new("total_runs", ColumnKind::Integer, true),
    ColumnSpec::new("player_dismissed", ColumnKind::Text, false),
    ColumnSpec::new("dismissal_kind", ColumnKind::Text, true),
];

/// One row of a relation as read from disk: a nullable cell per column.
pub type RawRow = Vec<Option<String>>;

/// A relation read from disk before typing and cleaning.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub relation: Relation,
    /// Where the rows came from (file path or a caller-chosen label).
    pub source: String,
    /// Whether each column was found in the source header.
    pub present: Vec<bool>,
    /// Rows in file order, cells in [`Relation::columns`] order.
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Creates an empty table for the given relation.
    pub fn new(relation: Relation, source: impl Into<String>) -> Self {
        Self {
            relation,
            source: source.into(),
            present: vec![true; relation.columns().len()],
            rows: Vec::new(),
        }
    }

    /// Builds a row from `(column, value)` pairs, leaving other cells null.
    #[cfg(test)]
    pub fn row(&self, cells: &[(&str, &str)]) -> RawRow {
        let mut row = vec![None; self.relation.columns().len()];
        for (column, value) in cells {
            if let Some(i) = self.relation.column_index(column) {
                row[i] = Some(value.to_string());
            }
        }
        row
    }

    /// Returns the cell of `row` under the named column.
    pub fn cell<'a>(&self, row: &'a RawRow, column: &str) -> Option<&'a str> {
        self.relation
            .column_index(column)
            .and_then(|i| row.get(i))
            .and_then(|c| c.as_deref())
    }
}

/// Both relations as read from disk.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub matches: RawTable,
    pub deliveries: RawTable,
}

/// A single match record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub season: Option<String>,
    pub city: Option<String>,
    pub date: Option<NaiveDate>,
    pub team1: String,
    pub team2: String,
    pub toss_winner: Option<String>,
    pub toss_decision: String,
    pub result: Option<String>,
    /// Winning team; absent for abandoned or no-result matches.
    pub winner: Option<String>,
    pub player_of_match: String,
    pub venue: String,
    /// Year of `date`, when the date parsed.
    pub match_year: Option<i32>,
    /// Sum of `total_runs` over this match's deliveries.
    pub total_runs_in_match: Option<i64>,
}

/// A single ball-by-ball delivery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub match_id: i64,
    pub inning: Option<i64>,
    pub over: i64,
    pub ball: Option<i64>,
    pub batting_team: String,
    pub bowling_team: String,
    pub batsman: String,
    pub bowler: String,
    pub batsman_runs: i64,
    pub extra_runs: Option<i64>,
    pub total_runs: i64,
    pub player_dismissed: Option<String>,
    /// Present only when a wicket fell on this delivery.
    pub dismissal_kind: Option<String>,
}

impl Delivery {
    /// Returns true if a wicket fell on this delivery.
    pub fn is_wicket(&self) -> bool {
        self.dismissal_kind.is_some()
    }
}

/// Both relations after typing and cleaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub matches: Vec<Match>,
    pub deliveries: Vec<Delivery>,
}

/// A delivery paired with the match it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct JoinedDelivery<'a> {
    pub delivery: &'a Delivery,
    pub match_record: &'a Match,
}

/// Null counts per column, taken before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingValueProfile {
    /// Column name to null count, in column order, per relation.
    pub matches: Vec<(String, usize)>,
    pub deliveries: Vec<(String, usize)>,
}

/// What cleaning did to the row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub match_rows_read: usize,
    pub match_rows_kept: usize,
    pub delivery_rows_read: usize,
    pub delivery_rows_kept: usize,
    /// Cells replaced by a fill-default policy.
    pub cells_filled: usize,
    /// Match dates that did not parse.
    pub unparsed_dates: usize,
    /// Deliveries whose match id has no match record.
    pub join_misses: usize,
}

/// A group label with its aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry<V> {
    pub label: String,
    pub value: V,
}

impl<V> RankedEntry<V> {
    pub fn new(label: impl Into<String>, value: V) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// A two-dimensional table with labelled rows and columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<C, V> {
    pub rows: Vec<String>,
    pub columns: Vec<C>,
    /// `cells[r][c]` is the value for `rows[r]` and `columns[c]`.
    pub cells: Vec<Vec<V>>,
}

#[cfg(test)]
impl<C: PartialEq, V> Grid<C, V> {
    /// Looks up a cell by its row and column labels.
    pub fn get(&self, row: &str, column: &C) -> Option<&V> {
        let r = self.rows.iter().position(|l| l == row)?;
        let c = self.columns.iter().position(|l| l == column)?;
        self.cells.get(r).and_then(|cells| cells.get(c))
    }
}

/// Deliveries whose run count lies outside the Tukey fences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    pub deliveries: Vec<Delivery>,
}

/// Every aggregate the pipeline computes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub total_matches: usize,
    pub total_runs: i64,
    pub top_scorers: Vec<RankedEntry<i64>>,
    pub top_wicket_takers: Vec<RankedEntry<usize>>,
    /// Mean runs per delivery, by over number.
    pub runs_per_over: BTreeMap<i64, f64>,
    pub team_runs: Vec<RankedEntry<i64>>,
    pub outliers: OutlierSummary,
    pub win_distribution: Vec<RankedEntry<usize>>,
    /// Toss decision by winner, zero-filled.
    pub toss_vs_win: Grid<String, usize>,
    pub venue_counts: Vec<RankedEntry<usize>>,
    pub avg_runs_per_team: Vec<RankedEntry<f64>>,
    pub matches_per_year: BTreeMap<i32, usize>,
    /// Batting team by over, mean runs per delivery; `None` where a team never batted that over.
    pub avg_runs_heatmap: Grid<i64, Option<f64>>,
    /// Match id to total runs scored, `None` for matches without deliveries.
    pub runs_per_match: BTreeMap<i64, Option<i64>>,
}

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub matches_source: String,
    pub deliveries_source: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// The complete result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub missing_values: MissingValueProfile,
    pub cleaning: CleaningStats,
    pub aggregates: Aggregates,
}
