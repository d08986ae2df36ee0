//! Named, enumerable form of the aggregates.
//!
//! A presentation layer only needs to walk [`Aggregates::tables`]: every
//! result comes out as either a scalar or a table of typed cells, keyed
//! by a stable name.

use crate::models::{Aggregates, AnalysisReport, Delivery, Grid, RankedEntry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single value in a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl Cell {
    /// Format the cell, rounding floats to `precision` decimal places.
    pub fn display(&self, precision: usize) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(n) => n.to_string(),
            Cell::Float(f) => format!("{:.*}", precision, f),
            Cell::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<f64> for Cell {
    fn from(f: f64) -> Self {
        Cell::Float(f)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// Column headers and rows of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    fn from_ranked<V: Clone + Into<Cell>>(
        label: &str,
        value: &str,
        entries: &[RankedEntry<V>],
    ) -> Self {
        let mut table = Self::new(&[label, value]);
        for entry in entries {
            table.push_row(vec![entry.label.as_str().into(), entry.value.clone().into()]);
        }
        table
    }

    fn from_map<K, V>(key: &str, value: &str, map: &BTreeMap<K, V>) -> Self
    where
        K: Copy + Into<Cell>,
        V: Clone + Into<Cell>,
    {
        let mut table = Self::new(&[key, value]);
        for (k, v) in map {
            table.push_row(vec![(*k).into(), v.clone().into()]);
        }
        table
    }

    fn from_grid<C, V>(corner: &str, grid: &Grid<C, V>) -> Self
    where
        C: fmt::Display,
        V: Clone + Into<Cell>,
    {
        let mut columns = vec![corner.to_string()];
        columns.extend(grid.columns.iter().map(|c| c.to_string()));

        let rows = grid
            .rows
            .iter()
            .zip(&grid.cells)
            .map(|(label, cells)| {
                std::iter::once(Cell::from(label.as_str()))
                    .chain(cells.iter().cloned().map(Into::into))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    fn from_deliveries(deliveries: &[Delivery]) -> Self {
        let mut table = Self::new(&[
            "match_id",
            "inning",
            "over",
            "ball",
            "batting_team",
            "batsman",
            "bowler",
            "total_runs",
        ]);
        for d in deliveries {
            table.push_row(vec![
                d.match_id.into(),
                d.inning.into(),
                d.over.into(),
                d.ball.into(),
                d.batting_team.as_str().into(),
                d.batsman.as_str().into(),
                d.bowler.as_str().into(),
                d.total_runs.into(),
            ]);
        }
        table
    }
}

/// One named result: a single value or a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Aggregate {
    Scalar(Cell),
    Table(Table),
}

impl Aggregates {
    /// Every aggregate, keyed by name.
    pub fn tables(&self) -> BTreeMap<&'static str, Aggregate> {
        let mut tables = BTreeMap::new();

        tables.insert(
            "total_matches",
            Aggregate::Scalar(self.total_matches.into()),
        );
        tables.insert("total_runs", Aggregate::Scalar(self.total_runs.into()));
        tables.insert(
            "top_scorers",
            Aggregate::Table(Table::from_ranked("batsman", "runs", &self.top_scorers)),
        );
        tables.insert(
            "top_wicket_takers",
            Aggregate::Table(Table::from_ranked(
                "bowler",
                "wickets",
                &self.top_wicket_takers,
            )),
        );
        tables.insert(
            "runs_per_over",
            Aggregate::Table(Table::from_map("over", "avg_runs", &self.runs_per_over)),
        );
        tables.insert(
            "team_runs",
            Aggregate::Table(Table::from_ranked("team", "runs", &self.team_runs)),
        );
        tables.insert(
            "outliers",
            Aggregate::Table(Table::from_deliveries(&self.outliers.deliveries)),
        );

        let mut bounds = Table::new(&["q1", "q3", "iqr", "lower_fence", "upper_fence"]);
        bounds.push_row(vec![
            self.outliers.q1.into(),
            self.outliers.q3.into(),
            self.outliers.iqr.into(),
            self.outliers.lower_fence.into(),
            self.outliers.upper_fence.into(),
        ]);
        tables.insert("outlier_bounds", Aggregate::Table(bounds));

        tables.insert(
            "win_distribution",
            Aggregate::Table(Table::from_ranked("team", "wins", &self.win_distribution)),
        );
        tables.insert(
            "toss_vs_win",
            Aggregate::Table(Table::from_grid("toss_decision", &self.toss_vs_win)),
        );
        tables.insert(
            "venue_counts",
            Aggregate::Table(Table::from_ranked("venue", "matches", &self.venue_counts)),
        );
        tables.insert(
            "avg_runs_per_team",
            Aggregate::Table(Table::from_ranked(
                "team",
                "avg_runs",
                &self.avg_runs_per_team,
            )),
        );
        tables.insert(
            "matches_per_year",
            Aggregate::Table(Table::from_map("year", "matches", &self.matches_per_year)),
        );
        tables.insert(
            "avg_runs_heatmap",
            Aggregate::Table(Table::from_grid("team", &self.avg_runs_heatmap)),
        );
        tables.insert(
            "runs_per_match",
            Aggregate::Table(Table::from_map("match_id", "runs", &self.runs_per_match)),
        );

        tables
    }
}

impl AnalysisReport {
    /// Every aggregate of this run, keyed by name.
    pub fn tables(&self) -> BTreeMap<&'static str, Aggregate> {
        self.aggregates.tables()
    }
}
