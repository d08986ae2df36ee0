//! The load, clean, derive, aggregate pipeline.

use super::aggregator;
use crate::cleaning::{self, CleanedData, TeamNormalizer};
use crate::config::Config;
use crate::error::PipelineError;
use crate::loader::CsvLoader;
use crate::models::{Aggregates, AnalysisReport, Dataset, RawDataset, ReportMetadata};
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Runs the analysis for one configuration.
///
/// The pipeline holds no data between calls; each run reads, cleans and
/// aggregates from scratch.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    teams: TeamNormalizer,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let teams = TeamNormalizer::new(&config.teams.renames);
        if teams.is_empty() {
            debug!("No team renames configured");
        } else {
            debug!("Team normalizer has {} renames", teams.len());
        }
        Self { config, teams }
    }

    /// Read both CSV files named in the configuration.
    pub fn load(&self) -> Result<RawDataset, PipelineError> {
        let loader = CsvLoader::new(&self.config.cleaning.null_tokens);
        loader.load_dataset(
            Path::new(&self.config.data.matches),
            Path::new(&self.config.data.deliveries),
        )
    }

    /// Clean both relations and derive the computed match columns.
    pub fn prepare(&self, raw: RawDataset) -> CleanedData {
        let mut cleaned = cleaning::clean(raw, &self.config.cleaning, &self.teams);

        let misses = aggregator::derive_match_columns(&mut cleaned.dataset);
        if misses > 0 {
            debug!("{} deliveries reference unknown matches", misses);
        }
        cleaned.stats.join_misses = misses;

        info!(
            "Prepared {} matches and {} deliveries",
            cleaned.dataset.matches.len(),
            cleaned.dataset.deliveries.len()
        );
        cleaned
    }

    /// Compute every aggregate over a prepared dataset.
    pub fn aggregate(&self, dataset: &Dataset) -> Aggregates {
        let ranking = &self.config.ranking;
        let matches = &dataset.matches;
        let deliveries = &dataset.deliveries;

        let outliers = aggregator::outliers(deliveries);
        debug!(
            "Outlier fences [{}, {}], {} deliveries flagged",
            outliers.lower_fence,
            outliers.upper_fence,
            outliers.deliveries.len()
        );

        Aggregates {
            total_matches: aggregator::total_matches(matches),
            total_runs: aggregator::total_runs(deliveries),
            top_scorers: aggregator::top_scorers(deliveries, ranking.top_scorers),
            top_wicket_takers: aggregator::top_wicket_takers(
                deliveries,
                ranking.top_wicket_takers,
            ),
            runs_per_over: aggregator::runs_per_over(deliveries),
            team_runs: aggregator::team_runs(deliveries),
            outliers,
            win_distribution: aggregator::win_distribution(matches),
            toss_vs_win: aggregator::toss_vs_win(matches),
            venue_counts: aggregator::venue_counts(matches, ranking.venues),
            avg_runs_per_team: aggregator::avg_runs_per_team(deliveries, ranking.team_averages),
            matches_per_year: aggregator::matches_per_year(matches),
            avg_runs_heatmap: aggregator::avg_runs_heatmap(deliveries),
            runs_per_match: aggregator::runs_per_match(matches),
        }
    }

    /// Load the configured files and run the whole analysis.
    pub fn run(&self) -> Result<AnalysisReport, PipelineError> {
        let raw = self.load()?;
        Ok(self.run_on(raw))
    }

    /// Run the analysis on tables that are already in memory.
    pub fn run_on(&self, raw: RawDataset) -> AnalysisReport {
        let start = Instant::now();
        let matches_source = raw.matches.source.clone();
        let deliveries_source = raw.deliveries.source.clone();

        let cleaned = self.prepare(raw);
        let aggregates = self.aggregate(&cleaned.dataset);

        AnalysisReport {
            metadata: ReportMetadata {
                matches_source,
                deliveries_source,
                generated_at: Utc::now(),
                duration_seconds: start.elapsed().as_secs_f64(),
            },
            missing_values: cleaned.missing_values,
            cleaning: cleaned.stats,
            aggregates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Delivery, Relation};

    const MATCHES: &str = "\
id,season,city,date,team1,team2,toss_winner,toss_decision,result,winner,player_of_match,venue
1,2017,Hyderabad,2017-04-05,Sunrisers Hyderabad,Delhi Daredevils,Delhi Daredevils,field,normal,Sunrisers Hyderabad,Yuvraj Singh,Rajiv Gandhi International Stadium
2,2017,Pune,06/04/2017,Kings XI Punjab,Delhi Daredevils,Kings XI Punjab,bat,normal,Kings XI Punjab,,Maharashtra Cricket Association Stadium
3,2018,Delhi,2018-04-08,Delhi Daredevils,Sunrisers Hyderabad,Sunrisers Hyderabad,field,no result,,,Feroz Shah Kotla
4,2018,Mohali,someday,Kings XI Punjab,Sunrisers Hyderabad,Kings XI Punjab,field,normal,Sunrisers Hyderabad,Rashid Khan,Punjab Cricket Association Stadium
";

    const DELIVERIES: &str = "\
match_id,inning,batting_team,bowling_team,over,ball,batsman,bowler,batsman_runs,extra_runs,total_runs,player_dismissed,dismissal_kind
1,1,Sunrisers Hyderabad,Delhi Daredevils,1,1,DA Warner,Z Khan,4,0,4,,
1,1,Sunrisers Hyderabad,Delhi Daredevils,1,2,DA Warner,Z Khan,6,0,6,,
1,1,Sunrisers Hyderabad,Delhi Daredevils,1,3,DA Warner,Z Khan,0,0,0,DA Warner,caught
1,2,Delhi Daredevils,Sunrisers Hyderabad,1,1,V Sehwag,B Kumar,1,0,1,,
1,2,Delhi Daredevils,Sunrisers Hyderabad,2,1,V Sehwag,B Kumar,0,1,1,,
2,1,Kings XI Punjab,Delhi Daredevils,1,1,KL Rahul,Z Khan,2,0,2,,
2,1,Kings XI Punjab,Delhi Daredevils,1,2,KL Rahul,Z Khan,0,0,0,KL Rahul,bowled
2,1,Kings XI Punjab,Delhi Daredevils,1,3,,Z Khan,1,0,1,,
99,1,Mumbai Indians,Chennai Super Kings,1,1,RG Sharma,DJ Bravo,4,0,4,,
";

    fn raw_dataset(config: &Config) -> RawDataset {
        let loader = CsvLoader::new(&config.cleaning.null_tokens);
        RawDataset {
            matches: loader
                .load_from_reader(Relation::Matches, "matches.csv", MATCHES.as_bytes())
                .unwrap(),
            deliveries: loader
                .load_from_reader(Relation::Deliveries, "deliveries.csv", DELIVERIES.as_bytes())
                .unwrap(),
        }
    }

    fn lenient_config() -> Config {
        let mut config = Config::default();
        config.cleaning.strict_deliveries = false;
        config
    }

    fn fixture_config(mut config: Config) -> Config {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        config.data.matches = fixtures.join("matches.csv").display().to_string();
        config.data.deliveries = fixtures.join("deliveries.csv").display().to_string();
        config
    }

    fn report_with(config: Config) -> AnalysisReport {
        let raw = raw_dataset(&config);
        Pipeline::new(config).run_on(raw)
    }

    fn report() -> AnalysisReport {
        report_with(Config::default())
    }

    fn assert_deliveries_fully_populated(deliveries: &[Delivery]) {
        for d in deliveries {
            assert!(d.inning.is_some(), "inning missing: {:?}", d);
            assert!(d.ball.is_some(), "ball missing: {:?}", d);
            assert!(d.extra_runs.is_some(), "extra_runs missing: {:?}", d);
            assert!(d.player_dismissed.is_some(), "player_dismissed missing: {:?}", d);
            assert!(d.dismissal_kind.is_some(), "dismissal_kind missing: {:?}", d);
        }
    }

    #[test]
    fn test_default_cleaning_leaves_no_null_delivery_fields() {
        let config = Config::default();
        let cleaned = Pipeline::new(config.clone()).prepare(raw_dataset(&config));
        assert_eq!(cleaned.dataset.deliveries.len(), 2);
        assert_deliveries_fully_populated(&cleaned.dataset.deliveries);

        let pipeline = Pipeline::new(fixture_config(Config::default()));
        let cleaned = pipeline.prepare(pipeline.load().unwrap());
        assert!(!cleaned.dataset.deliveries.is_empty());
        assert_deliveries_fully_populated(&cleaned.dataset.deliveries);
    }

    #[test]
    fn test_cleaning_invariants() {
        let config = lenient_config();
        let pipeline = Pipeline::new(config.clone());
        let cleaned = pipeline.prepare(raw_dataset(&config));

        // The row with no batsman is dropped
        assert_eq!(cleaned.dataset.deliveries.len(), 8);
        assert!(cleaned
            .dataset
            .deliveries
            .iter()
            .all(|d| !d.batsman.is_empty() && !d.batting_team.is_empty()));
        assert!(cleaned
            .dataset
            .matches
            .iter()
            .all(|m| !m.player_of_match.is_empty()));
        assert_eq!(cleaned.dataset.matches[1].player_of_match, "Unknown");
        assert_eq!(cleaned.stats.join_misses, 1);
        assert_eq!(cleaned.stats.unparsed_dates, 1);
    }

    #[test]
    fn test_derived_columns() {
        let config = lenient_config();
        let pipeline = Pipeline::new(config.clone());
        let cleaned = pipeline.prepare(raw_dataset(&config));
        let matches = &cleaned.dataset.matches;

        assert_eq!(matches[0].match_year, Some(2017));
        assert_eq!(matches[1].match_year, Some(2017));
        assert_eq!(matches[3].match_year, None);
        assert_eq!(matches[0].total_runs_in_match, Some(12));
        assert_eq!(matches[1].total_runs_in_match, Some(2));
        assert_eq!(matches[2].total_runs_in_match, None);
    }

    #[test]
    fn test_team_names_normalized_everywhere() {
        let report = report_with(lenient_config());
        let aggregates = &report.aggregates;

        let teams: Vec<&str> = aggregates
            .team_runs
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert!(teams.contains(&"Delhi Capitals"));
        assert!(teams.contains(&"Punjab Kings"));
        assert!(!teams.contains(&"Delhi Daredevils"));
        assert!(!teams.contains(&"Kings XI Punjab"));

        assert!(aggregates
            .toss_vs_win
            .columns
            .iter()
            .all(|c| c != "Kings XI Punjab"));
    }

    #[test]
    fn test_aggregate_totals() {
        let report = report();
        let aggregates = &report.aggregates;

        // Only the two wicket deliveries have no empty cell
        assert_eq!(report.cleaning.delivery_rows_kept, 2);
        assert_eq!(report.cleaning.join_misses, 0);
        assert_eq!(aggregates.total_matches, 4);
        assert_eq!(aggregates.total_runs, 0);
        let team_sum: i64 = aggregates.team_runs.iter().map(|e| e.value).sum();
        assert_eq!(team_sum, aggregates.total_runs);

        let scorers: Vec<(&str, i64)> = aggregates
            .top_scorers
            .iter()
            .map(|e| (e.label.as_str(), e.value))
            .collect();
        assert_eq!(scorers, vec![("DA Warner", 0), ("KL Rahul", 0)]);

        assert_eq!(aggregates.top_wicket_takers[0].label, "Z Khan");
        assert_eq!(aggregates.top_wicket_takers[0].value, 2);
        assert_eq!(aggregates.runs_per_match.get(&1), Some(&Some(0)));
        assert_eq!(aggregates.runs_per_match.get(&2), Some(&Some(0)));

        assert_eq!(aggregates.matches_per_year.get(&2017), Some(&2));
        assert_eq!(aggregates.win_distribution[0].label, "Sunrisers Hyderabad");
        assert_eq!(aggregates.win_distribution[0].value, 2);
    }

    #[test]
    fn test_lenient_aggregate_totals() {
        let report = report_with(lenient_config());
        let aggregates = &report.aggregates;

        assert_eq!(aggregates.total_matches, 4);
        // Deliveries are not restricted to the join
        assert_eq!(aggregates.total_runs, 18);
        let team_sum: i64 = aggregates.team_runs.iter().map(|e| e.value).sum();
        assert_eq!(team_sum, aggregates.total_runs);

        assert_eq!(aggregates.top_scorers[0].label, "DA Warner");
        assert_eq!(aggregates.top_scorers[0].value, 10);
        assert!(aggregates.top_scorers.len() <= 5);

        assert_eq!(aggregates.top_wicket_takers[0].label, "Z Khan");
        assert_eq!(aggregates.top_wicket_takers[0].value, 2);

        assert_eq!(aggregates.matches_per_year.get(&2017), Some(&2));
        assert_eq!(aggregates.matches_per_year.get(&2018), Some(&1));

        assert_eq!(aggregates.win_distribution[0].label, "Sunrisers Hyderabad");
        assert_eq!(aggregates.win_distribution[0].value, 2);
    }

    #[test]
    fn test_toss_vs_win_shape() {
        let report = report();
        let pivot = &report.aggregates.toss_vs_win;

        assert_eq!(pivot.rows, vec!["bat", "field"]);
        assert_eq!(pivot.columns, vec!["Punjab Kings", "Sunrisers Hyderabad"]);
        assert_eq!(pivot.cells, vec![vec![1, 0], vec![0, 2]]);
    }

    #[test]
    fn test_named_tables_cover_every_aggregate() {
        let tables = report().tables();
        for name in [
            "total_matches",
            "total_runs",
            "top_scorers",
            "top_wicket_takers",
            "runs_per_over",
            "team_runs",
            "outliers",
            "win_distribution",
            "toss_vs_win",
            "venue_counts",
            "avg_runs_per_team",
            "matches_per_year",
            "avg_runs_heatmap",
        ] {
            assert!(tables.contains_key(name), "missing aggregate {}", name);
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let first = report();
        let second = report();

        assert_eq!(first.aggregates, second.aggregates);
        assert_eq!(first.missing_values, second.missing_values);
        assert_eq!(first.cleaning, second.cleaning);
        assert_eq!(first.tables(), second.tables());
    }

    #[test]
    fn test_run_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.matches = dir.path().join("matches.csv").display().to_string();
        config.data.deliveries = dir.path().join("deliveries.csv").display().to_string();

        let err = Pipeline::new(config).run().unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
    }

    #[test]
    fn test_run_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let matches_path = dir.path().join("matches.csv");
        let deliveries_path = dir.path().join("deliveries.csv");
        std::fs::write(&matches_path, MATCHES).unwrap();
        std::fs::write(&deliveries_path, DELIVERIES).unwrap();
        config.data.matches = matches_path.display().to_string();
        config.data.deliveries = deliveries_path.display().to_string();

        let report = Pipeline::new(config).run().unwrap();
        assert_eq!(report.aggregates.total_matches, 4);
        assert!(report.metadata.matches_source.ends_with("matches.csv"));
    }

    #[test]
    fn test_fixture_dataset() {
        let report = Pipeline::new(fixture_config(Config::default())).run().unwrap();
        let stats = &report.cleaning;
        assert_eq!(stats.match_rows_kept, 6);
        assert_eq!(stats.delivery_rows_read, 23);
        assert_eq!(stats.delivery_rows_kept, 5);
        assert_eq!(stats.cells_filled, 2);
        assert_eq!(stats.join_misses, 0);

        let aggregates = &report.aggregates;
        assert_eq!(aggregates.total_runs, 0);
        let scorers: Vec<&str> = aggregates
            .top_scorers
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(
            scorers,
            vec!["DA Warner", "Mandeep Singh", "PA Patel", "V Kohli", "V Sehwag"]
        );
        let bowlers: Vec<&str> = aggregates
            .top_wicket_takers
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(
            bowlers,
            vec!["A Choudhary", "A Nehra", "AB Dinda", "B Lee", "DL Chahar"]
        );

        assert_eq!(
            aggregates.matches_per_year.iter().collect::<Vec<_>>(),
            vec![(&2008, &1), (&2017, &4), (&2019, &1)]
        );
        assert_eq!(aggregates.runs_per_match.get(&1), Some(&Some(0)));
        assert_eq!(aggregates.runs_per_match.get(&3), Some(&None));
        assert_eq!(aggregates.win_distribution.len(), 5);
        assert!(aggregates
            .team_runs
            .iter()
            .any(|e| e.label == "Delhi Capitals" && e.value == 0));

        let missing = &report.missing_values.matches;
        assert!(missing.contains(&("player_of_match".to_string(), 2)));
        assert!(missing.contains(&("winner".to_string(), 1)));
    }

    #[test]
    fn test_lenient_fixture_dataset() {
        let report = Pipeline::new(fixture_config(lenient_config())).run().unwrap();
        let stats = &report.cleaning;
        assert_eq!(stats.match_rows_kept, 6);
        assert_eq!(stats.delivery_rows_read, 23);
        assert_eq!(stats.delivery_rows_kept, 22);
        assert_eq!(stats.cells_filled, 2);
        assert_eq!(stats.join_misses, 1);

        let aggregates = &report.aggregates;
        assert_eq!(aggregates.total_runs, 46);
        let scorers: Vec<&str> = aggregates
            .top_scorers
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(
            scorers,
            vec!["AM Rahane", "RG Sharma", "S Dhawan", "DA Warner", "Mandeep Singh"]
        );
        let bowlers: Vec<&str> = aggregates
            .top_wicket_takers
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(
            bowlers,
            vec!["A Choudhary", "A Nehra", "AB Dinda", "B Lee", "DL Chahar"]
        );

        assert_eq!(
            aggregates.matches_per_year.iter().collect::<Vec<_>>(),
            vec![(&2008, &1), (&2017, &4), (&2019, &1)]
        );
        assert_eq!(aggregates.runs_per_match.get(&1), Some(&Some(16)));
        assert_eq!(aggregates.runs_per_match.get(&3), Some(&None));
        assert_eq!(aggregates.win_distribution.len(), 5);
        assert!(aggregates
            .team_runs
            .iter()
            .any(|e| e.label == "Delhi Capitals" && e.value == 5));

        let missing = &report.missing_values.matches;
        assert!(missing.contains(&("player_of_match".to_string(), 2)));
        assert!(missing.contains(&("winner".to_string(), 1)));
    }
}
