//! Football match feature derivation
//!
//! Turns historical results and betting odds into leakage-free per-match
//! features (Elo ratings, rolling form, head-to-head history) for outcome,
//! over/under and both-teams-to-score classifiers.

pub mod data;
pub mod features;
pub mod predict;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::data::chronology::DEFAULT_DATE_FORMATS;
use crate::features::elo::{INITIAL_ELO, K_FACTOR};
use crate::features::team_stats::WINDOW;

/// Full-time result from the home side's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    Home,
    Draw,
    Away,
}

impl MatchResult {
    pub fn from_goals(home_goals: u32, away_goals: u32) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => MatchResult::Home,
            std::cmp::Ordering::Less => MatchResult::Away,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }

    /// Single-letter code used by the FTR column
    pub fn code(&self) -> &'static str {
        match self {
            MatchResult::Home => "H",
            MatchResult::Draw => "D",
            MatchResult::Away => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "H" => Some(MatchResult::Home),
            "D" => Some(MatchResult::Draw),
            "A" => Some(MatchResult::Away),
            _ => None,
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Home => write!(f, "Home"),
            MatchResult::Draw => write!(f, "Draw"),
            MatchResult::Away => write!(f, "Away"),
        }
    }
}

/// Outcome of a match for one participating team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

/// Decimal odds passed through from the source file
///
/// Any column may be missing or malformed in the input, so every price is
/// optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
    pub over_2_5: Option<f64>,
    pub under_2_5: Option<f64>,
}

impl Odds {
    /// Prices in column order: AvgH, AvgD, AvgA, Avg>2.5, Avg<2.5
    pub fn values(&self) -> [Option<f64>; 5] {
        [
            self.home,
            self.draw,
            self.away,
            self.over_2_5,
            self.under_2_5,
        ]
    }

    pub fn is_complete(&self) -> bool {
        self.values().iter().all(Option::is_some)
    }
}

/// Identity of a match used for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub date: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
}

/// A single played match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDateTime,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub odds: Odds,
}

impl MatchRecord {
    pub fn result(&self) -> MatchResult {
        MatchResult::from_goals(self.home_goals, self.away_goals)
    }

    pub fn key(&self) -> MatchKey {
        MatchKey {
            date: self.date,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
        }
    }

    /// Check if the given team played in this match
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Check if this match was played between the two teams, in either order
    pub fn is_between(&self, team_a: &str, team_b: &str) -> bool {
        (self.home_team == team_a && self.away_team == team_b)
            || (self.home_team == team_b && self.away_team == team_a)
    }

    /// Goals scored by a specific team
    pub fn goals_for(&self, team: &str) -> Option<u32> {
        if team == self.home_team {
            Some(self.home_goals)
        } else if team == self.away_team {
            Some(self.away_goals)
        } else {
            None
        }
    }

    /// Goals conceded by a specific team
    pub fn goals_against(&self, team: &str) -> Option<u32> {
        if team == self.home_team {
            Some(self.away_goals)
        } else if team == self.away_team {
            Some(self.home_goals)
        } else {
            None
        }
    }

    /// Win, draw or loss for a specific team
    pub fn outcome_for(&self, team: &str) -> Option<Outcome> {
        let scored = self.goals_for(team)?;
        let conceded = self.goals_against(team)?;
        Some(match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Less => Outcome::Loss,
            std::cmp::Ordering::Equal => Outcome::Draw,
        })
    }

    pub fn total_goals(&self) -> u64 {
        u64::from(self.home_goals) + u64::from(self.away_goals)
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FootyError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Could not parse any date in the Date column ({total} rows)")]
    UnparseableDates { total: usize },

    #[error("League '{name}' not found (available files: {})", .available.join(", "))]
    LeagueNotFound { name: String, available: Vec<String> },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FootyError>;

/// Which rating a match's own Elo columns carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EloTiming {
    /// Ratings after the match's own result was applied (existing dataset files)
    #[default]
    PostMatch,
    /// Ratings going into the match
    PreMatch,
}

impl fmt::Display for EloTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EloTiming::PostMatch => write!(f, "post-match"),
            EloTiming::PreMatch => write!(f, "pre-match"),
        }
    }
}

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub k_factor: f64,
    pub initial_rating: f64,
    /// Number of recent matches in form and head-to-head windows
    pub window: usize,
    #[serde(default)]
    pub elo_timing: EloTiming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset_dir: String,
    /// strftime patterns tried in order when reading the Date column
    pub date_formats: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            k_factor: K_FACTOR,
            initial_rating: INITIAL_ELO,
            window: WINDOW,
            elo_timing: EloTiming::PostMatch,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            dataset_dir: "dataset".to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FootyError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FootyError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FootyError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
