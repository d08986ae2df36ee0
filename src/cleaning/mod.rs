//! Data cleaning.
//!
//! Cleaning is driven by a per-column policy table rather than ad-hoc
//! branches: each column either gets a default value filled in, causes
//! its row to be dropped when null, or is allowed to stay null. After
//! the policies run, rows are converted into typed [`Match`] and
//! [`Delivery`] records.

pub mod teams;

pub use teams::TeamNormalizer;

use crate::config::CleaningConfig;
use crate::models::{
    CleaningStats, Dataset, Delivery, Match, MissingValueProfile, RawDataset, RawRow, RawTable,
    Relation,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What to do with a null cell in a given column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FieldPolicy {
    /// Replace the null with a fixed value and keep the row.
    Fill { value: String },
    /// Discard the whole row.
    DropRow,
    /// Leave the cell null.
    KeepNull,
}

/// Resolved cleaning rules for one relation.
#[derive(Debug, Clone)]
pub struct CleaningPolicy {
    relation: Relation,
    /// One entry per column of the relation, in storage order.
    rules: Vec<FieldPolicy>,
}

/// Result of applying a [`CleaningPolicy`] to a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOutcome {
    /// Cells filled in each surviving row, aligned with the table's rows.
    pub filled: Vec<usize>,
    pub rows_dropped: usize,
}

impl PolicyOutcome {
    /// Total cells filled across the surviving rows.
    pub fn cells_filled(&self) -> usize {
        self.filled.iter().sum()
    }
}

impl CleaningPolicy {
    /// Build a policy from a `column -> policy` table. Columns not named
    /// in the table keep their nulls.
    pub fn new(relation: Relation, policies: &BTreeMap<String, FieldPolicy>) -> Self {
        let mut rules = vec![FieldPolicy::KeepNull; relation.columns().len()];

        for (column, policy) in policies {
            match relation.column_index(column) {
                Some(i) => rules[i] = policy.clone(),
                None => warn!("Ignoring cleaning policy for unknown {} column '{}'", relation, column),
            }
        }

        Self { relation, rules }
    }

    /// Policy for the match relation.
    pub fn for_matches(config: &CleaningConfig) -> Self {
        Self::new(Relation::Matches, &config.matches)
    }

    /// Policy for the delivery relation. In strict mode every column that
    /// would keep its nulls drops the row instead.
    pub fn for_deliveries(config: &CleaningConfig) -> Self {
        let mut policy = Self::new(Relation::Deliveries, &config.deliveries);
        if config.strict_deliveries {
            for rule in &mut policy.rules {
                if *rule == FieldPolicy::KeepNull {
                    *rule = FieldPolicy::DropRow;
                }
            }
        }
        policy
    }

    /// Returns the policy for a column.
    #[cfg(test)]
    pub fn policy(&self, column: &str) -> Option<&FieldPolicy> {
        self.relation
            .column_index(column)
            .and_then(|i| self.rules.get(i))
    }

    /// Apply the policy to every row of `table`, in place. Columns absent
    /// from the source header are skipped.
    pub fn apply(&self, table: &mut RawTable) -> PolicyOutcome {
        debug_assert_eq!(self.relation, table.relation);

        let mut outcome = PolicyOutcome::default();
        let present = table.present.clone();
        let rows_before = table.rows.len();

        table.rows.retain_mut(|row| {
            let mut filled = 0;
            for (i, rule) in self.rules.iter().enumerate() {
                if !present.get(i).copied().unwrap_or(false) || row[i].is_some() {
                    continue;
                }
                match rule {
                    FieldPolicy::Fill { value } => {
                        row[i] = Some(value.clone());
                        filled += 1;
                    }
                    FieldPolicy::DropRow => return false,
                    FieldPolicy::KeepNull => {}
                }
            }
            outcome.filled.push(filled);
            true
        });

        outcome.rows_dropped = rows_before - table.rows.len();
        outcome
    }
}

/// Count the nulls in every column of `table` that was present in its source.
pub fn profile_missing(table: &RawTable) -> Vec<(String, usize)> {
    table
        .relation
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| table.present.get(*i).copied().unwrap_or(false))
        .map(|(i, column)| {
            let nulls = table
                .rows
                .iter()
                .filter(|row| row.get(i).map_or(true, Option::is_none))
                .count();
            (column.name.to_string(), nulls)
        })
        .collect()
}

/// Parses match dates against an ordered list of formats.
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<String>,
}

impl DateParser {
    pub fn new(formats: &[String]) -> Self {
        Self {
            formats: formats.to_vec(),
        }
    }

    /// Parse a date, returning `None` when no format matches.
    ///
    /// A trailing time component (`2017-04-05 00:00:00`) is ignored.
    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        let date_part = value
            .split(|c: char| c == ' ' || c == 'T')
            .next()
            .unwrap_or(value);

        self.formats.iter().find_map(|format| {
            NaiveDate::parse_from_str(value, format)
                .or_else(|_| NaiveDate::parse_from_str(date_part, format))
                .ok()
        })
    }
}

/// Parse a whole number, accepting float spellings with no fractional part.
pub fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

/// Both relations after cleaning, with the bookkeeping gathered on the way.
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub dataset: Dataset,
    pub missing_values: MissingValueProfile,
    pub stats: CleaningStats,
}

/// Clean both relations and convert them into typed records.
///
/// Team names are normalized here so that nothing downstream ever sees
/// a historical spelling.
pub fn clean(
    mut raw: RawDataset,
    config: &CleaningConfig,
    teams: &TeamNormalizer,
) -> CleanedData {
    let missing_values = MissingValueProfile {
        matches: profile_missing(&raw.matches),
        deliveries: profile_missing(&raw.deliveries),
    };

    let mut stats = CleaningStats {
        match_rows_read: raw.matches.rows.len(),
        delivery_rows_read: raw.deliveries.rows.len(),
        ..CleaningStats::default()
    };

    let match_outcome = CleaningPolicy::for_matches(config).apply(&mut raw.matches);
    let delivery_outcome = CleaningPolicy::for_deliveries(config).apply(&mut raw.deliveries);

    debug!(
        "Cleaning policies dropped {} match rows and {} delivery rows, filled {} cells",
        match_outcome.rows_dropped,
        delivery_outcome.rows_dropped,
        match_outcome.cells_filled() + delivery_outcome.cells_filled()
    );

    let dates = DateParser::new(&config.date_formats);

    let mut matches = Vec::with_capacity(raw.matches.rows.len());
    // Fills only count for rows that survive typed conversion
    for (row, filled) in raw.matches.rows.iter().zip(&match_outcome.filled) {
        match match_from_row(&raw.matches, row, &dates) {
            Some(mut record) => {
                stats.cells_filled += filled;
                if record.date.is_none() {
                    stats.unparsed_dates += 1;
                }
                teams.apply_to_match(&mut record);
                matches.push(record);
            }
            None => debug!("Skipping match row with missing required values: {:?}", row),
        }
    }

    let mut deliveries = Vec::with_capacity(raw.deliveries.rows.len());
    for (row, filled) in raw.deliveries.rows.iter().zip(&delivery_outcome.filled) {
        match delivery_from_row(&raw.deliveries, row) {
            Some(mut record) => {
                stats.cells_filled += filled;
                teams.apply_to_delivery(&mut record);
                deliveries.push(record);
            }
            None => debug!("Skipping delivery row with missing required values: {:?}", row),
        }
    }

    if stats.unparsed_dates > 0 {
        warn!("{} match dates could not be parsed", stats.unparsed_dates);
    }

    stats.match_rows_kept = matches.len();
    stats.delivery_rows_kept = deliveries.len();

    CleanedData {
        dataset: Dataset {
            matches,
            deliveries,
        },
        missing_values,
        stats,
    }
}

fn text(table: &RawTable, row: &RawRow, column: &str) -> Option<String> {
    table.cell(row, column).map(str::to_string)
}

fn integer(table: &RawTable, row: &RawRow, column: &str) -> Option<i64> {
    table.cell(row, column).and_then(parse_integer)
}

/// Convert a cleaned match row. Returns `None` if a required value is null.
fn match_from_row(table: &RawTable, row: &RawRow, dates: &DateParser) -> Option<Match> {
    let date = table.cell(row, "date").and_then(|d| dates.parse(d));

    Some(Match {
        id: integer(table, row, "id")?,
        season: text(table, row, "season"),
        city: text(table, row, "city"),
        date,
        team1: text(table, row, "team1")?,
        team2: text(table, row, "team2")?,
        toss_winner: text(table, row, "toss_winner"),
        toss_decision: text(table, row, "toss_decision")?,
        result: text(table, row, "result"),
        winner: text(table, row, "winner"),
        player_of_match: text(table, row, "player_of_match")?,
        venue: text(table, row, "venue")?,
        match_year: None,
        total_runs_in_match: None,
    })
}

/// Convert a cleaned delivery row. Returns `None` if a required value is null.
fn delivery_from_row(table: &RawTable, row: &RawRow) -> Option<Delivery> {
    Some(Delivery {
        match_id: integer(table, row, "match_id")?,
        inning: integer(table, row, "inning"),
        over: integer(table, row, "over")?,
        ball: integer(table, row, "ball"),
        batting_team: text(table, row, "batting_team")?,
        bowling_team: text(table, row, "bowling_team")?,
        batsman: text(table, row, "batsman")?,
        bowler: text(table, row, "bowler")?,
        batsman_runs: integer(table, row, "batsman_runs")?,
        extra_runs: integer(table, row, "extra_runs"),
        total_runs: integer(table, row, "total_runs")?,
        player_dismissed: text(table, row, "player_dismissed"),
        dismissal_kind: text(table, row, "dismissal_kind"),
    })
}
