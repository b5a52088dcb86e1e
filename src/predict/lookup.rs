//! Feature lookup for fixtures that have not been played
//!
//! This path never advances ratings. Each team's rating is the one it held
//! after its latest recorded match; form and head-to-head cover the whole
//! history.

use serde::Serialize;

use crate::data::chronology::Timeline;
use crate::features::elo::{EloConfig, EloFeatures, EloRatings};
use crate::features::head_to_head::h2h_stats;
use crate::features::match_repr::DerivedFeatures;
use crate::features::odds::ImpliedProbabilities;
use crate::features::team_stats::{recent_stats, FormStats};
use crate::{EloTiming, EngineConfig, FootyError, Odds, Result};

/// Latest known rating per team
pub struct RatingLookup<'a> {
    timeline: &'a Timeline,
    replayed: Option<EloRatings>,
}

impl<'a> RatingLookup<'a> {
    /// Use the stored Elo columns when every row carries post-match values,
    /// otherwise replay the history
    pub fn new(timeline: &'a Timeline, config: &EngineConfig) -> Self {
        let use_stored =
            config.elo_timing == EloTiming::PostMatch && timeline.has_stored_ratings();
        let replayed = if use_stored {
            None
        } else {
            log::debug!("Replaying ratings over {} matches", timeline.len());
            Some(EloRatings::from_matches(
                &timeline.matches,
                EloConfig::from(config),
            ))
        };
        RatingLookup { timeline, replayed }
    }

    /// Rating after the team's latest match, or None if it never played
    pub fn rating(&self, team: &str) -> Option<f64> {
        match &self.replayed {
            Some(elo) => elo.contains(team).then(|| elo.get_rating(team)),
            None => self
                .timeline
                .matches
                .iter()
                .zip(&self.timeline.stored_ratings)
                .rev()
                .find(|(m, _)| m.involves(team))
                .and_then(|(m, stored)| {
                    let stored = (*stored)?;
                    Some(if m.home_team == team {
                        stored.home
                    } else {
                        stored.away
                    })
                }),
        }
    }
}

/// Features for a hypothetical fixture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureFeatures {
    pub home_team: String,
    pub away_team: String,
    pub derived: DerivedFeatures,
    /// Prices supplied by the caller, absent by default
    pub odds: Odds,
}

impl FixtureFeatures {
    pub fn with_odds(mut self, odds: Odds) -> Self {
        self.odds = odds;
        self
    }

    pub fn model_vector(&self) -> Option<Vec<f64>> {
        self.derived.model_vector(&self.odds)
    }

    pub fn implied_probabilities(&self) -> ImpliedProbabilities {
        ImpliedProbabilities::from_odds(&self.odds)
    }
}

/// Features for `home` v `away` after the last match in `timeline`
///
/// Unseen teams get the initial rating and empty windows.
pub fn fixture_features(
    timeline: &Timeline,
    home: &str,
    away: &str,
    config: &EngineConfig,
) -> FixtureFeatures {
    let ratings = RatingLookup::new(timeline, config);
    let home_elo = ratings.rating(home).unwrap_or(config.initial_rating);
    let away_elo = ratings.rating(away).unwrap_or(config.initial_rating);

    FixtureFeatures {
        home_team: home.to_string(),
        away_team: away.to_string(),
        derived: DerivedFeatures {
            elo: EloFeatures::new(home_elo, away_elo),
            home_form: recent_stats(&timeline.matches, home, config.window),
            away_form: recent_stats(&timeline.matches, away, config.window),
            h2h: h2h_stats(&timeline.matches, home, away, config.window),
        },
        odds: Odds::default(),
    }
}

/// Recent form and latest rating of one team
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub team: String,
    pub recent: FormStats,
    pub last_rating: f64,
}

pub fn team_summary(
    timeline: &Timeline,
    team: &str,
    config: &EngineConfig,
) -> Result<TeamSummary> {
    let last_rating = RatingLookup::new(timeline, config)
        .rating(team)
        .ok_or_else(|| FootyError::UnknownTeam(team.to_string()))?;
    Ok(TeamSummary {
        team: team.to_string(),
        recent: recent_stats(&timeline.matches, team, config.window),
        last_rating,
    })
}

/// Sorted unique team names in the history
pub fn teams(timeline: &Timeline) -> Vec<String> {
    timeline.teams()
}

/// Format fixture features for display
pub fn format_fixture(features: &FixtureFeatures) -> String {
    let d = &features.derived;
    let mut output = String::new();

    output.push_str(&format!(
        "{} vs {}\n\n",
        features.home_team, features.away_team
    ));
    output.push_str(&format!(
        "Elo:          {:.2} - {:.2} (diff {:+.2})\n",
        d.elo.home_elo, d.elo.away_elo, d.elo.elo_diff
    ));
    for (label, form) in [("Home form:", &d.home_form), ("Away form:", &d.away_form)] {
        output.push_str(&format!(
            "{:<14}{}W {}D {}L, {:.2} scored / {:.2} conceded per match ({} played)\n",
            label,
            form.wins,
            form.draws,
            form.losses,
            form.avg_goals_scored,
            form.avg_goals_conceded,
            form.matches
        ));
    }
    output.push_str(&format!(
        "Head-to-head: {}-{}-{} in last {} meetings, avg goals {:.2} - {:.2}\n",
        d.h2h.a_wins,
        d.h2h.draws,
        d.h2h.b_wins,
        d.h2h.meetings,
        d.h2h.avg_a_goals,
        d.h2h.avg_b_goals
    ));

    let implied = features.implied_probabilities();
    if let Some((home, draw, away)) = implied.outcome {
        output.push_str(&format!(
            "Market:       H {:.1}% D {:.1}% A {:.1}% (margin {:.1}%)\n",
            home * 100.0,
            draw * 100.0,
            away * 100.0,
            implied.margin.unwrap_or_default() * 100.0
        ));
    }
    if let Some((over, under)) = implied.totals {
        output.push_str(&format!(
            "Goals 2.5:    over {:.1}% / under {:.1}%\n",
            over * 100.0,
            under * 100.0
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::StoredRatings;
    use crate::MatchRecord;
    use chrono::NaiveDate;

    fn make_match(
        day: u32,
        home: &str,
        away: &str,
        home_goals: u32,
        away_goals: u32,
    ) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2024, 2, day)
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

    fn timeline() -> Timeline {
        Timeline::from_matches(vec![
            make_match(1, "A", "B", 2, 0),
            make_match(2, "A", "C", 1, 1),
        ])
    }

    #[test]
    fn test_replayed_ratings_are_post_match() {
        let t = timeline();
        let features = fixture_features(&t, "A", "B", &EngineConfig::default());
        let expected_a = 1515.0 + 30.0 * (0.5 - 1.0 / (1.0 + 10f64.powf(-15.0 / 400.0)));
        assert!((features.derived.elo.home_elo - expected_a).abs() < 1e-9);
        assert!((features.derived.elo.away_elo - 1485.0).abs() < 1e-9);
        assert_eq!(features.derived.home_form.matches, 2);
        assert_eq!(features.derived.h2h.a_wins, 1);
        assert!(features.model_vector().is_none());
    }

    #[test]
    fn test_lookup_does_not_mutate_history() {
        let t = timeline();
        let config = EngineConfig::default();
        let first = fixture_features(&t, "B", "C", &config);
        let second = fixture_features(&t, "B", "C", &config);
        assert_eq!(first, second);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_unseen_team_gets_defaults() {
        let t = timeline();
        let features = fixture_features(&t, "Z", "A", &EngineConfig::default());
        assert_eq!(features.derived.elo.home_elo, 1500.0);
        assert_eq!(features.derived.home_form, FormStats::default());
        assert_eq!(features.derived.h2h.meetings, 0);
    }

    #[test]
    fn test_stored_ratings_are_preferred() {
        let mut t = timeline();
        t.stored_ratings = vec![
            Some(StoredRatings { home: 1600.0, away: 1400.0 }),
            Some(StoredRatings { home: 1610.0, away: 1490.0 }),
        ];
        let config = EngineConfig::default();
        let lookup = RatingLookup::new(&t, &config);
        assert_eq!(lookup.rating("A"), Some(1610.0));
        assert_eq!(lookup.rating("B"), Some(1400.0));
        assert_eq!(lookup.rating("C"), Some(1490.0));
        assert_eq!(lookup.rating("D"), None);

        let pre = EngineConfig {
            elo_timing: EloTiming::PreMatch,
            ..EngineConfig::default()
        };
        assert!((RatingLookup::new(&t, &pre).rating("B").unwrap() - 1485.0).abs() < 1e-9);
    }

    #[test]
    fn test_team_summary() {
        let t = timeline();
        let config = EngineConfig::default();
        let summary = team_summary(&t, "C", &config).unwrap();
        assert_eq!(summary.recent.draws, 1);
        assert!(summary.last_rating > 1500.0);
        assert!(matches!(
            team_summary(&t, "Nobody", &config),
            Err(FootyError::UnknownTeam(_))
        ));
        assert_eq!(teams(&t), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_format_fixture() {
        let features = fixture_features(&timeline(), "A", "B", &EngineConfig::default());
        let text = format_fixture(&features);
        assert!(text.starts_with("A vs B"));
        assert!(text.contains("Head-to-head: 1-0-0"));
        assert!(!text.contains("Market:"));

        let priced = features.with_odds(Odds {
            home: Some(2.0),
            draw: Some(4.0),
            away: Some(4.0),
            over_2_5: Some(1.6),
            under_2_5: Some(2.4),
        });
        let text = format_fixture(&priced);
        assert!(text.contains("Market:       H 50.0% D 25.0% A 25.0% (margin 0.0%)"));
        assert!(text.contains("Goals 2.5:    over 60.0% / under 40.0%"));
        assert_eq!(priced.model_vector().map(|v| v.len()), Some(23));
    }
}
