//! Sequential feature derivation over an ordered match history
//!
//! The scan visits matches in chronological order. For each match the form
//! and head-to-head windows are read BEFORE the match is pushed, and ratings
//! are advanced exactly once, so a row only ever sees earlier matches.

use std::collections::HashSet;

use crate::data::chronology::{DateParser, LoadReport, Timeline};
use crate::data::table::RawRow;
use crate::features::elo::{EloConfig, EloFeatures, EloRatings};
use crate::features::head_to_head::HeadToHeadTracker;
use crate::features::match_repr::{DerivedFeatures, FeatureRecord};
use crate::features::team_stats::RollingForm;
use crate::{EloTiming, EngineConfig, MatchKey, MatchRecord, Result};

const PROGRESS_INTERVAL: usize = 500;

/// State of one derivation: ratings plus the rolling windows
///
/// A scan is local to one call; concurrent derivations each build their own.
#[derive(Debug, Clone)]
pub struct FeatureScan {
    elo: EloRatings,
    form: RollingForm,
    h2h: HeadToHeadTracker,
    timing: EloTiming,
    processed: usize,
}

impl FeatureScan {
    pub fn new(config: &EngineConfig) -> Self {
        FeatureScan {
            elo: EloRatings::new(EloConfig::from(config)),
            form: RollingForm::new(config.window),
            h2h: HeadToHeadTracker::new(config.window),
            timing: config.elo_timing,
            processed: 0,
        }
    }

    /// Features for `record`, then fold it into the state
    ///
    /// Matches must be fed in chronological order.
    pub fn step(&mut self, record: &MatchRecord) -> FeatureRecord {
        // Compute everything BEFORE updating the windows
        let before = (
            self.elo.get_rating(&record.home_team),
            self.elo.get_rating(&record.away_team),
        );
        let home_form = self.form.get_stats(&record.home_team);
        let away_form = self.form.get_stats(&record.away_team);
        let h2h = self.h2h.get_stats(&record.home_team, &record.away_team);

        // Ratings are advanced once per match, whichever pair is reported
        let after = self.elo.update(record);
        let elo = EloFeatures::select(self.timing, before, after);

        self.form.add_match(record);
        self.h2h.add_match(record);
        self.processed += 1;
        if self.processed % PROGRESS_INTERVAL == 0 {
            log::debug!("Processed {} matches", self.processed);
        }

        FeatureRecord::new(
            record.clone(),
            DerivedFeatures {
                elo,
                home_form,
                away_form,
                h2h,
            },
        )
    }

    pub fn processed(&self) -> usize {
        self.processed
    }
}

/// Run a fresh scan over an ordered history
pub fn scan(matches: &[MatchRecord], config: &EngineConfig) -> Vec<FeatureRecord> {
    let mut state = FeatureScan::new(config);
    matches.iter().map(|m| state.step(m)).collect()
}

/// Full featurisation of one raw batch
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub records: Vec<FeatureRecord>,
    pub report: LoadReport,
}

/// Order, clean and featurise raw rows
pub fn derive_batch(
    rows: Vec<RawRow>,
    parser: &DateParser,
    config: &EngineConfig,
) -> Result<BatchOutput> {
    let timeline = Timeline::from_rows(rows, parser)?;
    let records = scan(&timeline.matches, config);
    log::info!(
        "Derived features for {} matches ({} rows dropped)",
        records.len(),
        timeline.report.dropped()
    );
    Ok(BatchOutput {
        records,
        report: timeline.report,
    })
}

/// Feature rows for the genuinely new matches of an upload
#[derive(Debug, Clone, Default)]
pub struct IncrementalOutput {
    /// New rows in chronological order
    pub records: Vec<FeatureRecord>,
    /// Uploaded matches already present in the history
    pub duplicates: usize,
}

/// Extend an existing history with new matches
///
/// Duplicates (same date and teams) are skipped, the remainder is merged
/// into the history, and the whole combined history is replayed from
/// scratch. A match dated on the same timestamp as an existing one sorts
/// after it.
///
/// The returned rows are the ones originating from `new_matches`, not the
/// rows at positions `existing.len()..` of the replay. The two sets agree
/// when every new match is dated after the history; a backfilled match is
/// still returned here even though it lands inside the existing range.
pub fn derive_incremental(
    existing: &[MatchRecord],
    new_matches: Vec<MatchRecord>,
    config: &EngineConfig,
) -> IncrementalOutput {
    let mut seen: HashSet<MatchKey> = existing.iter().map(MatchRecord::key).collect();
    let uploaded = new_matches.len();
    let fresh: Vec<MatchRecord> = new_matches
        .into_iter()
        .filter(|m| seen.insert(m.key()))
        .collect();
    let duplicates = uploaded - fresh.len();
    if duplicates > 0 {
        log::info!("Skipped {} matches already in the dataset", duplicates);
    }
    if fresh.is_empty() {
        return IncrementalOutput {
            records: Vec::new(),
            duplicates,
        };
    }

    let mut combined: Vec<(&MatchRecord, bool)> = existing
        .iter()
        .map(|m| (m, false))
        .chain(fresh.iter().map(|m| (m, true)))
        .collect();
    combined.sort_by_key(|(m, _)| m.date);

    let mut state = FeatureScan::new(config);
    let records: Vec<FeatureRecord> = combined
        .into_iter()
        .filter_map(|(m, is_new)| {
            let features = state.step(m);
            is_new.then_some(features)
        })
        .collect();

    log::info!(
        "Derived {} new rows after replaying {} matches",
        records.len(),
        state.processed()
    );
    IncrementalOutput {
        records,
        duplicates,
    }
}

/// Parse an uploaded batch and extend `existing` with it
pub fn derive_incremental_rows(
    existing: &Timeline,
    rows: Vec<RawRow>,
    parser: &DateParser,
    config: &EngineConfig,
) -> Result<IncrementalOutput> {
    let upload = Timeline::from_rows(rows, parser)?;
    Ok(derive_incremental(&existing.matches, upload.matches, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Odds;
    use chrono::NaiveDate;

    fn make_match(
        day: u32,
        home: &str,
        away: &str,
        home_goals: u32,
        away_goals: u32,
    ) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_goals,
            away_goals,
            odds: Odds::default(),
        }
    }

    #[test]
    fn test_first_match_has_empty_windows() {
        let records = scan(&[make_match(1, "A", "B", 2, 0)], &EngineConfig::default());
        let first = &records[0];
        assert_eq!(first.home_form.matches, 0);
        assert_eq!(first.away_form.matches, 0);
        assert_eq!(first.h2h.meetings, 0);
        // Post-match convention: the row carries its own result
        assert!((first.elo.home_elo - 1515.0).abs() < 1e-9);
        assert!((first.elo.away_elo - 1485.0).abs() < 1e-9);
        assert!((first.elo.elo_diff - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_pre_match_timing() {
        let config = EngineConfig {
            elo_timing: EloTiming::PreMatch,
            ..EngineConfig::default()
        };
        let matches = vec![make_match(1, "A", "B", 2, 0), make_match(2, "A", "B", 0, 0)];
        let records = scan(&matches, &config);
        assert_eq!(records[0].elo.home_elo, 1500.0);
        assert!((records[1].elo.home_elo - 1515.0).abs() < 1e-9);
        assert!((records[1].elo.away_elo - 1485.0).abs() < 1e-9);
    }

    #[test]
    fn test_step_excludes_current_match() {
        let matches = vec![make_match(1, "A", "B", 2, 0), make_match(2, "B", "A", 3, 1)];
        let records = scan(&matches, &EngineConfig::default());
        let second = &records[1];
        assert_eq!(second.home_form.matches, 1);
        assert_eq!(second.home_form.losses, 1);
        assert_eq!(second.away_form.wins, 1);
        // From B's side as home team
        assert_eq!(second.h2h.a_wins, 0);
        assert_eq!(second.h2h.b_wins, 1);
        assert_eq!(second.h2h.avg_a_goals, 0.0);
        assert_eq!(second.h2h.avg_b_goals, 2.0);
    }

    #[test]
    fn test_incremental_skips_duplicates() {
        let existing = vec![make_match(1, "A", "B", 2, 0)];
        let upload = vec![make_match(1, "A", "B", 2, 0), make_match(2, "B", "A", 1, 1)];
        let out = derive_incremental(&existing, upload, &EngineConfig::default());
        assert_eq!(out.duplicates, 1);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].record.home_team, "B");
        assert_eq!(out.records[0].home_form.matches, 1);
    }

    #[test]
    fn test_incremental_duplicates_within_upload() {
        let upload = vec![make_match(3, "A", "B", 2, 0), make_match(3, "A", "B", 2, 0)];
        let out = derive_incremental(&[], upload, &EngineConfig::default());
        assert_eq!(out.duplicates, 1);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn test_backfilled_match_changes_later_history() {
        let existing = vec![make_match(1, "A", "B", 1, 0), make_match(5, "A", "B", 0, 0)];
        let upload = vec![make_match(3, "B", "A", 4, 0)];
        let out = derive_incremental(&existing, upload, &EngineConfig::default());
        assert_eq!(out.records.len(), 1);
        let row = &out.records[0];
        assert_eq!(row.record.date, make_match(3, "B", "A", 0, 0).date);
        assert_eq!(row.home_form.matches, 1);
        assert_eq!(row.h2h.b_wins, 1);
    }

    #[test]
    fn test_backfilled_rows_equal_batch_rows() {
        let existing = vec![
            make_match(1, "A", "B", 1, 0),
            make_match(5, "A", "B", 0, 0),
            make_match(7, "B", "A", 2, 1),
        ];
        // One match inside the history, one sharing a timestamp with it
        let upload = vec![make_match(3, "B", "A", 4, 0), make_match(5, "C", "A", 1, 2)];
        let config = EngineConfig::default();

        let mut combined = existing.clone();
        combined.extend(upload.iter().cloned());
        combined.sort_by_key(|m| m.date);
        let batch = scan(&combined, &config);
        assert_eq!(batch[3].record, upload[1]);

        let out = derive_incremental(&existing, upload, &config);
        assert_eq!(out.records, vec![batch[1].clone(), batch[3].clone()]);

        // The existing day-5 match is already in A's window
        let tied = &out.records[1];
        assert_eq!(tied.away_form.matches, 3);
        assert_eq!(tied.away_form.draws, 1);
    }

    #[test]
    fn test_large_goal_counts_scan_cleanly() {
        let matches = vec![
            make_match(1, "A", "B", 4_000_000_000, 0),
            make_match(2, "A", "C", 4_000_000_000, 0),
            make_match(3, "A", "D", 1, 0),
        ];
        let records = scan(&matches, &EngineConfig::default());
        assert_eq!(records[2].home_form.wins, 2);
        assert_eq!(records[2].home_form.avg_goals_scored, 4_000_000_000.0);
        assert!(records[2].targets().over_2_5);
    }
}
