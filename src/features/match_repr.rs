//! Per-match feature record and model-facing vector layout

use serde::Serialize;

use crate::features::elo::EloFeatures;
use crate::features::head_to_head::HeadToHead;
use crate::features::odds::{ImpliedProbabilities, MatchTargets};
use crate::features::team_stats::FormStats;
use crate::{MatchRecord, Odds};

/// Model-facing columns: five odds followed by the 18 derived features
pub const FEATURE_COLUMNS: [&str; 23] = [
    "AvgH",
    "AvgD",
    "AvgA",
    "Avg>2.5",
    "Avg<2.5",
    "HomeTeamElo",
    "AwayTeamElo",
    "EloDifference",
    "Home_AvgGoalsScored",
    "Home_AvgGoalsConceded",
    "Home_Wins",
    "Home_Draws",
    "Home_Losses",
    "Away_AvgGoalsScored",
    "Away_AvgGoalsConceded",
    "Away_Wins",
    "Away_Draws",
    "Away_Losses",
    "HTH_HomeWins",
    "HTH_AwayWins",
    "HTH_Draws",
    "HTH_AvgHomeGoals",
    "HTH_AvgAwayGoals",
];

/// Derived part of a feature record (Elo, both forms, head-to-head)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedFeatures {
    pub elo: EloFeatures,
    pub home_form: FormStats,
    pub away_form: FormStats,
    /// From the home side's perspective
    pub h2h: HeadToHead,
}

impl DerivedFeatures {
    pub const DIM: usize = EloFeatures::DIM + 2 * FormStats::DIM + HeadToHead::DIM;

    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = self.elo.to_vec();
        v.extend(self.home_form.to_vec());
        v.extend(self.away_form.to_vec());
        v.extend(self.h2h.to_vec());
        v
    }

    /// Odds followed by derived values, or None if any price is absent
    pub fn model_vector(&self, odds: &Odds) -> Option<Vec<f64>> {
        let mut v = odds
            .values()
            .into_iter()
            .collect::<Option<Vec<f64>>>()?;
        v.extend(self.to_vec());
        Some(v)
    }
}

/// Features of one match, computed from strictly earlier matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub record: MatchRecord,
    pub elo: EloFeatures,
    pub home_form: FormStats,
    pub away_form: FormStats,
    pub h2h: HeadToHead,
}

impl FeatureRecord {
    pub fn new(record: MatchRecord, derived: DerivedFeatures) -> Self {
        FeatureRecord {
            record,
            elo: derived.elo,
            home_form: derived.home_form,
            away_form: derived.away_form,
            h2h: derived.h2h,
        }
    }

    pub fn derived(&self) -> DerivedFeatures {
        DerivedFeatures {
            elo: self.elo,
            home_form: self.home_form,
            away_form: self.away_form,
            h2h: self.h2h,
        }
    }

    /// Vector in `FEATURE_COLUMNS` order; None when the row lacks odds
    pub fn model_vector(&self) -> Option<Vec<f64>> {
        self.derived().model_vector(&self.record.odds)
    }

    pub fn implied_probabilities(&self) -> ImpliedProbabilities {
        ImpliedProbabilities::from_odds(&self.record.odds)
    }

    pub fn targets(&self) -> MatchTargets {
        MatchTargets::from_record(&self.record)
    }
}
