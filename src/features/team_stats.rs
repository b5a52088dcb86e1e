//! Team form statistics
//!
//! Form covers a team's last `window` matches strictly before a cutoff,
//! home and away combined, regardless of opponent.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::{MatchRecord, Outcome};

/// Default number of recent matches in a form window
pub const WINDOW: usize = 5;

/// Form of a team over its recent matches
///
/// All fields are zero when the team has no earlier matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FormStats {
    /// Matches actually inside the window (at most the window size)
    pub matches: usize,
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl FormStats {
    pub const DIM: usize = 5;

    /// Summarise a set of matches from one team's perspective
    pub fn from_matches<'a, I>(team: &str, matches: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchRecord>,
    {
        let mut stats = FormStats::default();
        let mut scored = 0u64;
        let mut conceded = 0u64;

        for record in matches {
            let (Some(goals_for), Some(goals_against), Some(outcome)) = (
                record.goals_for(team),
                record.goals_against(team),
                record.outcome_for(team),
            ) else {
                continue;
            };
            stats.matches += 1;
            scored += u64::from(goals_for);
            conceded += u64::from(goals_against);
            match outcome {
                Outcome::Win => stats.wins += 1,
                Outcome::Draw => stats.draws += 1,
                Outcome::Loss => stats.losses += 1,
            }
        }

        if stats.matches > 0 {
            stats.avg_goals_scored = scored as f64 / stats.matches as f64;
            stats.avg_goals_conceded = conceded as f64 / stats.matches as f64;
        }
        stats
    }

    /// Values in column order: scored, conceded, wins, draws, losses
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.avg_goals_scored,
            self.avg_goals_conceded,
            self.wins as f64,
            self.draws as f64,
            self.losses as f64,
        ]
    }
}

/// Form of `team` over its last `window` matches in `history`
///
/// `history` must be the ordered prefix before the cutoff.
pub fn recent_stats(history: &[MatchRecord], team: &str, window: usize) -> FormStats {
    let recent: Vec<&MatchRecord> = history
        .iter()
        .rev()
        .filter(|m| m.involves(team))
        .take(window)
        .collect();
    FormStats::from_matches(team, recent)
}

/// Per-team rolling windows for a single forward scan
#[derive(Debug, Clone)]
pub struct RollingForm {
    window: usize,
    recent_matches: HashMap<String, VecDeque<MatchRecord>>,
}

impl RollingForm {
    pub fn new(window: usize) -> Self {
        RollingForm {
            window,
            recent_matches: HashMap::new(),
        }
    }

    /// Add a match to both participants' windows
    pub fn add_match(&mut self, record: &MatchRecord) {
        self.push(&record.home_team, record);
        if record.away_team != record.home_team {
            self.push(&record.away_team, record);
        }
    }

    fn push(&mut self, team: &str, record: &MatchRecord) {
        if self.window == 0 {
            return;
        }
        let matches = self.recent_matches.entry(team.to_string()).or_default();
        matches.push_back(record.clone());
        if matches.len() > self.window {
            matches.pop_front();
        }
    }

    /// Form over the matches added so far
    pub fn get_stats(&self, team: &str) -> FormStats {
        match self.recent_matches.get(team) {
            Some(matches) => FormStats::from_matches(team, matches),
            None => FormStats::default(),
        }
    }

    pub fn match_count(&self, team: &str) -> usize {
        self.recent_matches.get(team).map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for RollingForm {
    fn default() -> Self {
        Self::new(WINDOW)
    }
}
