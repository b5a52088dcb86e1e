//! Elo rating system for team strength estimation
//!
//! Ratings start at 1500 and move by K * (actual - expected) after every
//! match. There is no home advantage term and no margin-of-victory scaling.

use std::collections::HashMap;

use serde::Serialize;

use crate::{EloTiming, EngineConfig, MatchRecord, MatchResult};

/// Rating assigned to a team before its first match
pub const INITIAL_ELO: f64 = 1500.0;

/// Rating change per unit of surprise
pub const K_FACTOR: f64 = 30.0;

/// Elo rating configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EloConfig {
    /// K-factor: how much ratings change per match
    pub k_factor: f64,
    /// Starting rating for new teams
    pub initial_rating: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        EloConfig {
            k_factor: K_FACTOR,
            initial_rating: INITIAL_ELO,
        }
    }
}

impl From<&EngineConfig> for EloConfig {
    fn from(config: &EngineConfig) -> Self {
        EloConfig {
            k_factor: config.k_factor,
            initial_rating: config.initial_rating,
        }
    }
}

/// Elo rating computer
#[derive(Debug, Clone)]
pub struct EloRatings {
    ratings: HashMap<String, f64>,
    config: EloConfig,
}

impl Default for EloRatings {
    fn default() -> Self {
        Self::new(EloConfig::default())
    }
}

impl EloRatings {
    pub fn new(config: EloConfig) -> Self {
        EloRatings {
            ratings: HashMap::new(),
            config,
        }
    }

    /// Replay a chronologically ordered history from scratch
    pub fn from_matches(matches: &[MatchRecord], config: EloConfig) -> Self {
        let mut elo = Self::new(config);
        for record in matches {
            elo.update(record);
        }
        elo
    }

    /// Get current rating for a team (returns initial if unknown)
    pub fn get_rating(&self, team: &str) -> f64 {
        self.ratings
            .get(team)
            .copied()
            .unwrap_or(self.config.initial_rating)
    }

    /// Whether the team has played at least one rated match
    pub fn contains(&self, team: &str) -> bool {
        self.ratings.contains_key(team)
    }

    /// Compute expected score (0-1) for the home team
    pub fn expected_score(&self, home: &str, away: &str) -> f64 {
        expected_score(self.get_rating(home), self.get_rating(away))
    }

    /// Apply a result and return the post-match (home, away) ratings
    ///
    /// Both new ratings are computed from the pre-match values, so the home
    /// update never leaks into the away update.
    pub fn advance(
        &mut self,
        home: &str,
        away: &str,
        home_goals: u32,
        away_goals: u32,
    ) -> (f64, f64) {
        let home_rating = self.get_rating(home);
        let away_rating = self.get_rating(away);
        let home_expected = expected_score(home_rating, away_rating);
        let home_actual = actual_score(MatchResult::from_goals(home_goals, away_goals));

        let home_new = home_rating + self.config.k_factor * (home_actual - home_expected);
        let away_new =
            away_rating + self.config.k_factor * ((1.0 - home_actual) - (1.0 - home_expected));

        self.ratings.insert(home.to_string(), home_new);
        self.ratings.insert(away.to_string(), away_new);
        (home_new, away_new)
    }

    /// Update ratings after a match
    pub fn update(&mut self, record: &MatchRecord) -> (f64, f64) {
        self.advance(
            &record.home_team,
            &record.away_team,
            record.home_goals,
            record.away_goals,
        )
    }

    /// All rated teams and their current ratings
    pub fn ratings(&self) -> &HashMap<String, f64> {
        &self.ratings
    }
}

/// E_home = 1 / (1 + 10^((R_away - R_home) / 400))
pub fn expected_score(home_rating: f64, away_rating: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((away_rating - home_rating) / 400.0))
}

/// 1 = home win, 0.5 = draw, 0 = away win
fn actual_score(result: MatchResult) -> f64 {
    match result {
        MatchResult::Home => 1.0,
        MatchResult::Draw => 0.5,
        MatchResult::Away => 0.0,
    }
}

/// Elo features for a match
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EloFeatures {
    pub home_elo: f64,
    pub away_elo: f64,
    pub elo_diff: f64,
}

impl EloFeatures {
    pub const DIM: usize = 3;

    pub fn new(home_elo: f64, away_elo: f64) -> Self {
        EloFeatures {
            home_elo,
            away_elo,
            elo_diff: home_elo - away_elo,
        }
    }

    /// Pick the pre- or post-match pair according to the timing convention
    pub fn select(timing: EloTiming, before: (f64, f64), after: (f64, f64)) -> Self {
        match timing {
            EloTiming::PostMatch => Self::new(after.0, after.1),
            EloTiming::PreMatch => Self::new(before.0, before.1),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.home_elo, self.away_elo, self.elo_diff]
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::Odds;

    fn make_match(home: &str, away: &str, home_goals: u32, away_goals: u32) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1)
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
    fn test_initial_ratings() {
        let elo = EloRatings::default();
        assert_eq!(elo.get_rating("Arsenal"), 1500.0);
        assert!(!elo.contains("Arsenal"));
    }

    #[test]
    fn test_expected_score_equal_teams() {
        let elo = EloRatings::default();
        assert!((elo.expected_score("A", "B") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_home_win_between_new_teams() {
        let mut elo = EloRatings::default();
        let (home, away) = elo.update(&make_match("A", "B", 2, 0));
        assert!((home - 1515.0).abs() < 1e-9);
        assert!((away - 1485.0).abs() < 1e-9);
    }

    #[test]
    fn test_draw_between_equal_teams_is_neutral() {
        let mut elo = EloRatings::default();
        let (home, away) = elo.update(&make_match("A", "B", 1, 1));
        assert_eq!(home, 1500.0);
        assert_eq!(away, 1500.0);
    }

    #[test]
    fn test_updates_are_zero_sum() {
        let mut elo = EloRatings::default();
        elo.update(&make_match("A", "B", 3, 1));
        elo.update(&make_match("B", "C", 0, 2));
        elo.update(&make_match("C", "A", 1, 1));
        let total: f64 = elo.ratings().values().sum();
        assert!((total - 3.0 * 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_upset_moves_more_points() {
        let mut elo = EloRatings::default();
        elo.update(&make_match("A", "B", 2, 0));
        // B (1485) beating A (1515) away gains more than 15
        let (_, away) = elo.update(&make_match("A", "B", 0, 1));
        assert!(away - 1485.0 > 15.0);
    }

    #[test]
    fn test_replay_matches_incremental_updates() {
        let matches = vec![
            make_match("A", "B", 2, 0),
            make_match("B", "C", 1, 1),
            make_match("C", "A", 0, 4),
        ];
        let replayed = EloRatings::from_matches(&matches, EloConfig::default());
        let mut stepped = EloRatings::default();
        for m in &matches {
            stepped.update(m);
        }
        for team in ["A", "B", "C"] {
            assert_eq!(replayed.get_rating(team), stepped.get_rating(team));
        }
    }

    #[test]
    fn test_feature_timing_selection() {
        let before = (1500.0, 1500.0);
        let after = (1515.0, 1485.0);
        let post = EloFeatures::select(EloTiming::PostMatch, before, after);
        assert_eq!(post.elo_diff, 30.0);
        let pre = EloFeatures::select(EloTiming::PreMatch, before, after);
        assert_eq!(pre.elo_diff, 0.0);
        assert_eq!(pre.to_vec().len(), EloFeatures::DIM);
    }
}
