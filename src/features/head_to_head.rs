//! Head-to-head history between two teams
//!
//! Meetings are matched on the unordered pair, so a fixture played at either
//! ground counts. Every statistic is reported from `team_a`'s side.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::features::team_stats::WINDOW;
use crate::{MatchRecord, Outcome};

/// Direct-meeting statistics from `team_a`'s perspective
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeadToHead {
    /// Meetings inside the window (at most the window size)
    pub meetings: usize,
    pub a_wins: u32,
    pub b_wins: u32,
    pub draws: u32,
    pub avg_a_goals: f64,
    pub avg_b_goals: f64,
}

impl HeadToHead {
    pub const DIM: usize = 5;

    /// Summarise meetings between `team_a` and `team_b`
    ///
    /// Matches not between the two teams are skipped.
    pub fn from_meetings<'a, I>(team_a: &str, team_b: &str, meetings: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchRecord>,
    {
        let mut h2h = HeadToHead::default();
        let mut a_goals = 0u64;
        let mut b_goals = 0u64;

        for record in meetings {
            if !record.is_between(team_a, team_b) {
                continue;
            }
            let (Some(scored), Some(conceded), Some(outcome)) = (
                record.goals_for(team_a),
                record.goals_against(team_a),
                record.outcome_for(team_a),
            ) else {
                continue;
            };
            h2h.meetings += 1;
            a_goals += u64::from(scored);
            b_goals += u64::from(conceded);
            match outcome {
                Outcome::Win => h2h.a_wins += 1,
                Outcome::Loss => h2h.b_wins += 1,
                Outcome::Draw => h2h.draws += 1,
            }
        }

        if h2h.meetings > 0 {
            h2h.avg_a_goals = a_goals as f64 / h2h.meetings as f64;
            h2h.avg_b_goals = b_goals as f64 / h2h.meetings as f64;
        }
        h2h
    }

    /// Values in column order: a wins, b wins, draws, a goals, b goals
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.a_wins as f64,
            self.b_wins as f64,
            self.draws as f64,
            self.avg_a_goals,
            self.avg_b_goals,
        ]
    }
}

/// Last `window` meetings of `team_a` and `team_b` in `history`
///
/// `history` must be the ordered prefix before the cutoff.
pub fn h2h_stats(history: &[MatchRecord], team_a: &str, team_b: &str, window: usize) -> HeadToHead {
    let meetings: Vec<&MatchRecord> = history
        .iter()
        .rev()
        .filter(|m| m.is_between(team_a, team_b))
        .take(window)
        .collect();
    HeadToHead::from_meetings(team_a, team_b, meetings)
}

/// Per-pairing meeting windows for a single forward scan
#[derive(Debug, Clone)]
pub struct HeadToHeadTracker {
    window: usize,
    meetings: HashMap<(String, String), VecDeque<MatchRecord>>,
}

impl HeadToHeadTracker {
    pub fn new(window: usize) -> Self {
        HeadToHeadTracker {
            window,
            meetings: HashMap::new(),
        }
    }

    /// Order-independent key for a pairing
    fn pair_key(team_a: &str, team_b: &str) -> (String, String) {
        if team_a <= team_b {
            (team_a.to_string(), team_b.to_string())
        } else {
            (team_b.to_string(), team_a.to_string())
        }
    }

    pub fn add_match(&mut self, record: &MatchRecord) {
        if self.window == 0 {
            return;
        }
        let key = Self::pair_key(&record.home_team, &record.away_team);
        let meetings = self.meetings.entry(key).or_default();
        meetings.push_back(record.clone());
        if meetings.len() > self.window {
            meetings.pop_front();
        }
    }

    /// Meetings added so far, from `team_a`'s perspective
    pub fn get_stats(&self, team_a: &str, team_b: &str) -> HeadToHead {
        match self.meetings.get(&Self::pair_key(team_a, team_b)) {
            Some(meetings) => HeadToHead::from_meetings(team_a, team_b, meetings),
            None => HeadToHead::default(),
        }
    }
}

impl Default for HeadToHeadTracker {
    fn default() -> Self {
        Self::new(WINDOW)
    }
}
