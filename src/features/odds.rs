//! Odds-implied probabilities and classifier targets

use serde::Serialize;

use crate::{MatchRecord, MatchResult, Odds};

/// Bookmaker margin removed from the outcome and totals markets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImpliedProbabilities {
    /// (home, draw, away), summing to 1
    pub outcome: Option<(f64, f64, f64)>,
    /// (over 2.5, under 2.5), summing to 1
    pub totals: Option<(f64, f64)>,
    /// Overround removed from the outcome market
    pub margin: Option<f64>,
}

impl ImpliedProbabilities {
    pub fn from_odds(odds: &Odds) -> Self {
        let outcome = match (odds.home, odds.draw, odds.away) {
            (Some(h), Some(d), Some(a)) => {
                let (ph, pd, pa) = (1.0 / h, 1.0 / d, 1.0 / a);
                let total = ph + pd + pa;
                Some((ph / total, pd / total, pa / total))
            }
            _ => None,
        };
        let totals = match (odds.over_2_5, odds.under_2_5) {
            (Some(over), Some(under)) => {
                let (po, pu) = (1.0 / over, 1.0 / under);
                let total = po + pu;
                Some((po / total, pu / total))
            }
            _ => None,
        };
        ImpliedProbabilities {
            outcome,
            totals,
            margin: Self::outcome_margin(odds),
        }
    }

    /// Bookmaker overround on the 1X2 market (sum of raw inverse prices - 1)
    pub fn outcome_margin(odds: &Odds) -> Option<f64> {
        match (odds.home, odds.draw, odds.away) {
            (Some(h), Some(d), Some(a)) => Some(1.0 / h + 1.0 / d + 1.0 / a - 1.0),
            _ => None,
        }
    }
}

/// Labels for the three classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchTargets {
    pub result: MatchResult,
    pub over_2_5: bool,
    pub both_teams_scored: bool,
}

impl MatchTargets {
    pub fn from_record(record: &MatchRecord) -> Self {
        MatchTargets {
            result: record.result(),
            over_2_5: record.total_goals() > 2,
            both_teams_scored: record.home_goals > 0 && record.away_goals > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_match(home_goals: u32, away_goals: u32) -> MatchRecord {
        MatchRecord {
            date: NaiveDate::from_ymd_opt(2023, 8, 11)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap(),
            home_team: "Burnley".to_string(),
            away_team: "Man City".to_string(),
            home_goals,
            away_goals,
            odds: Odds::default(),
        }
    }

    #[test]
    fn test_probabilities_are_normalised() {
        let odds = Odds {
            home: Some(2.0),
            draw: Some(3.5),
            away: Some(4.0),
            over_2_5: Some(1.85),
            under_2_5: Some(1.95),
        };
        let implied = ImpliedProbabilities::from_odds(&odds);
        let (h, d, a) = implied.outcome.unwrap();
        assert!((h + d + a - 1.0).abs() < 1e-12);
        assert!(h > d && d > a);
        let (over, under) = implied.totals.unwrap();
        assert!((over + under - 1.0).abs() < 1e-12);
        assert!(over > under);
        let margin = implied.margin.unwrap();
        assert!((margin - (0.5 + 1.0 / 3.5 + 0.25 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_price_disables_group() {
        let odds = Odds {
            home: Some(2.0),
            draw: None,
            away: Some(4.0),
            over_2_5: Some(1.85),
            under_2_5: Some(1.95),
        };
        let implied = ImpliedProbabilities::from_odds(&odds);
        assert!(implied.outcome.is_none());
        assert!(implied.margin.is_none());
        assert!(implied.totals.is_some());
    }

    #[test]
    fn test_targets() {
        let t = MatchTargets::from_record(&make_match(0, 3));
        assert_eq!(t.result, MatchResult::Away);
        assert!(t.over_2_5);
        assert!(!t.both_teams_scored);

        let t = MatchTargets::from_record(&make_match(1, 1));
        assert_eq!(t.result, MatchResult::Draw);
        assert!(!t.over_2_5);
        assert!(t.both_teams_scored);
    }
}
