//! Match and delivery aggregation.
//!
//! Every function here is a pure computation over cleaned records.
//! Rankings sort by value (highest first) and break ties on the group
//! label, so the same input always yields the same order.

use crate::models::{Dataset, Delivery, Grid, JoinedDelivery, Match, OutlierSummary, RankedEntry};
use chrono::Datelike;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sum values per key.
fn sum_by<K: Ord>(items: impl Iterator<Item = (K, i64)>) -> BTreeMap<K, i64> {
    let mut sums = BTreeMap::new();
    for (key, value) in items {
        *sums.entry(key).or_insert(0) += value;
    }
    sums
}

/// Count occurrences per key.
fn count_by<K: Ord>(keys: impl Iterator<Item = K>) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Arithmetic mean of values per key.
fn mean_by<K: Ord>(items: impl Iterator<Item = (K, i64)>) -> BTreeMap<K, f64> {
    let mut acc: BTreeMap<K, (i64, usize)> = BTreeMap::new();
    for (key, value) in items {
        let entry = acc.entry(key).or_insert((0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    acc.into_iter()
        .map(|(key, (sum, n))| (key, sum as f64 / n as f64))
        .collect()
}

/// Order groups by value descending, then label ascending, keeping at most `limit`.
fn rank<V: PartialOrd>(groups: BTreeMap<&str, V>, limit: Option<usize>) -> Vec<RankedEntry<V>> {
    let mut ranked: Vec<RankedEntry<V>> = groups
        .into_iter()
        .map(|(label, value)| RankedEntry::new(label, value))
        .collect();

    ranked.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });

    if let Some(n) = limit {
        ranked.truncate(n);
    }
    ranked
}

/// Inner join of deliveries onto matches by match id.
///
/// Returns the joined rows in delivery order and the number of deliveries
/// whose match id has no match record. When several matches share an id
/// the first one wins.
pub fn join_deliveries<'a>(
    matches: &'a [Match],
    deliveries: &'a [Delivery],
) -> (Vec<JoinedDelivery<'a>>, usize) {
    let mut by_id: HashMap<i64, &Match> = HashMap::with_capacity(matches.len());
    for record in matches {
        by_id.entry(record.id).or_insert(record);
    }

    let mut misses = 0;
    let joined = deliveries
        .iter()
        .filter_map(|delivery| match by_id.get(&delivery.match_id).copied() {
            Some(match_record) => Some(JoinedDelivery {
                delivery,
                match_record,
            }),
            None => {
                misses += 1;
                None
            }
        })
        .collect();

    (joined, misses)
}

/// Fill in `match_year` and `total_runs_in_match` on every match.
///
/// Returns the number of deliveries excluded from the join.
pub fn derive_match_columns(dataset: &mut Dataset) -> usize {
    let (runs, misses) = {
        let (joined, misses) = join_deliveries(&dataset.matches, &dataset.deliveries);
        let runs = sum_by(
            joined
                .iter()
                .map(|j| (j.match_record.id, j.delivery.total_runs)),
        );
        (runs, misses)
    };

    for record in &mut dataset.matches {
        record.match_year = record.date.map(|d| d.year());
        record.total_runs_in_match = runs.get(&record.id).copied();
    }

    misses
}

/// Number of match records.
pub fn total_matches(matches: &[Match]) -> usize {
    matches.len()
}

/// Sum of `total_runs` over every delivery.
pub fn total_runs(deliveries: &[Delivery]) -> i64 {
    deliveries.iter().map(|d| d.total_runs).sum()
}

/// Batsmen with the most runs off the bat.
pub fn top_scorers(deliveries: &[Delivery], n: usize) -> Vec<RankedEntry<i64>> {
    let runs = sum_by(
        deliveries
            .iter()
            .map(|d| (d.batsman.as_str(), d.batsman_runs)),
    );
    rank(runs, Some(n))
}

/// Bowlers credited with the most dismissals.
pub fn top_wicket_takers(deliveries: &[Delivery], n: usize) -> Vec<RankedEntry<usize>> {
    let wickets = count_by(
        deliveries
            .iter()
            .filter(|d| d.is_wicket())
            .map(|d| d.bowler.as_str()),
    );
    rank(wickets, Some(n))
}

/// Mean runs per delivery for each over number.
pub fn runs_per_over(deliveries: &[Delivery]) -> BTreeMap<i64, f64> {
    mean_by(deliveries.iter().map(|d| (d.over, d.total_runs)))
}

/// Total runs per batting team, highest first.
pub fn team_runs(deliveries: &[Delivery]) -> Vec<RankedEntry<i64>> {
    let runs = sum_by(
        deliveries
            .iter()
            .map(|d| (d.batting_team.as_str(), d.total_runs)),
    );
    rank(runs, None)
}

/// Quantile of sorted values, interpolating linearly between closest ranks.
pub fn quantile(sorted: &[i64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    let low = sorted[lower] as f64;
    let high = sorted[upper] as f64;
    Some(low + (high - low) * fraction)
}

/// Deliveries whose `total_runs` fall outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
pub fn outliers(deliveries: &[Delivery]) -> OutlierSummary {
    let mut runs: Vec<i64> = deliveries.iter().map(|d| d.total_runs).collect();
    runs.sort_unstable();

    let q1 = quantile(&runs, 0.25).unwrap_or(0.0);
    let q3 = quantile(&runs, 0.75).unwrap_or(0.0);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let flagged = deliveries
        .iter()
        .filter(|d| {
            let runs = d.total_runs as f64;
            runs < lower_fence || runs > upper_fence
        })
        .cloned()
        .collect();

    OutlierSummary {
        q1,
        q3,
        iqr,
        lower_fence,
        upper_fence,
        deliveries: flagged,
    }
}

/// Matches won per team, most wins first. Matches without a winner are skipped.
pub fn win_distribution(matches: &[Match]) -> Vec<RankedEntry<usize>> {
    let wins = count_by(matches.iter().filter_map(|m| m.winner.as_deref()));
    rank(wins, None)
}

/// Match counts by toss decision (rows) and winner (columns), zero-filled.
pub fn toss_vs_win(matches: &[Match]) -> Grid<String, usize> {
    let counts = count_by(matches.iter().filter_map(|m| {
        m.winner
            .as_deref()
            .map(|winner| (m.toss_decision.as_str(), winner))
    }));

    let rows: BTreeSet<&str> = counts.keys().map(|(decision, _)| *decision).collect();
    let columns: BTreeSet<&str> = counts.keys().map(|(_, winner)| *winner).collect();

    let cells = rows
        .iter()
        .map(|decision| {
            columns
                .iter()
                .map(|winner| counts.get(&(*decision, *winner)).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    Grid {
        rows: rows.into_iter().map(String::from).collect(),
        columns: columns.into_iter().map(String::from).collect(),
        cells,
    }
}

/// Venues hosting the most matches.
pub fn venue_counts(matches: &[Match], n: usize) -> Vec<RankedEntry<usize>> {
    let counts = count_by(matches.iter().map(|m| m.venue.as_str()));
    rank(counts, Some(n))
}

/// Mean runs per delivery for each batting team, highest first.
pub fn avg_runs_per_team(deliveries: &[Delivery], n: usize) -> Vec<RankedEntry<f64>> {
    let means = mean_by(
        deliveries
            .iter()
            .map(|d| (d.batting_team.as_str(), d.total_runs)),
    );
    rank(means, Some(n))
}

/// Matches played per calendar year. Matches without a parsed date are skipped.
pub fn matches_per_year(matches: &[Match]) -> BTreeMap<i32, usize> {
    count_by(matches.iter().filter_map(|m| m.match_year))
}

/// Mean runs per delivery for each batting team and over.
pub fn avg_runs_heatmap(deliveries: &[Delivery]) -> Grid<i64, Option<f64>> {
    let means = mean_by(
        deliveries
            .iter()
            .map(|d| ((d.batting_team.as_str(), d.over), d.total_runs)),
    );

    let teams: BTreeSet<&str> = means.keys().map(|(team, _)| *team).collect();
    let overs: BTreeSet<i64> = means.keys().map(|(_, over)| *over).collect();

    let cells = teams
        .iter()
        .map(|team| {
            overs
                .iter()
                .map(|over| means.get(&(*team, *over)).copied())
                .collect()
        })
        .collect();

    Grid {
        rows: teams.into_iter().map(String::from).collect(),
        columns: overs.into_iter().collect(),
        cells,
    }
}

/// Total runs scored in each match, keyed by match id.
pub fn runs_per_match(matches: &[Match]) -> BTreeMap<i64, Option<i64>> {
    matches
        .iter()
        .map(|m| (m.id, m.total_runs_in_match))
        .collect()
}
