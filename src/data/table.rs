//! CSV input and output for match tables
//!
//! Raw rows keep every cell as text so that malformed numbers can be coerced
//! per column instead of failing the whole file.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::chronology::CANONICAL_DATE_FORMAT;
use crate::features::{FeatureRecord, ImpliedProbabilities, MatchTargets};
use crate::{FootyError, Odds, Result};

/// Columns without which a file cannot be ordered or attributed
pub const REQUIRED_COLUMNS: [&str; 3] = ["Date", "HomeTeam", "AwayTeam"];

/// Output schema: passthrough columns followed by the 18 derived columns
pub const OUTPUT_COLUMNS: [&str; 29] = [
    "Date",
    "HomeTeam",
    "AwayTeam",
    "FTHG",
    "FTAG",
    "FTR",
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

/// One unparsed row of a results file
///
/// Unknown columns are ignored; empty cells read as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    #[serde(rename = "HomeTeam", default)]
    pub home_team: Option<String>,
    #[serde(rename = "AwayTeam", default)]
    pub away_team: Option<String>,
    #[serde(rename = "FTHG", default)]
    pub home_goals: Option<String>,
    #[serde(rename = "FTAG", default)]
    pub away_goals: Option<String>,
    #[serde(rename = "FTR", default)]
    pub result: Option<String>,
    #[serde(rename = "AvgH", default)]
    pub odds_home: Option<String>,
    #[serde(rename = "AvgD", default)]
    pub odds_draw: Option<String>,
    #[serde(rename = "AvgA", default)]
    pub odds_away: Option<String>,
    #[serde(rename = "Avg>2.5", default)]
    pub odds_over: Option<String>,
    #[serde(rename = "Avg<2.5", default)]
    pub odds_under: Option<String>,
    #[serde(rename = "HomeTeamElo", default)]
    pub home_elo: Option<String>,
    #[serde(rename = "AwayTeamElo", default)]
    pub away_elo: Option<String>,
}

/// Elo columns already present on a featurised row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredRatings {
    pub home: f64,
    pub away: f64,
}

/// Goals after coercion, with a flag set when either value was repaired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goals {
    pub home: u32,
    pub away: u32,
    pub coerced: bool,
}

impl RawRow {
    /// Home and away team names, or None if either is blank
    pub fn team_names(&self) -> Option<(String, String)> {
        let home = self.home_team.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let away = self.away_team.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((home.to_string(), away.to_string()))
    }

    /// Full-time goals; missing or malformed values become 0
    pub fn goals(&self) -> Goals {
        let home = parse_goals(self.home_goals.as_deref());
        let away = parse_goals(self.away_goals.as_deref());
        Goals {
            home: home.unwrap_or(0),
            away: away.unwrap_or(0),
            coerced: home.is_none() || away.is_none(),
        }
    }

    pub fn odds(&self) -> Odds {
        Odds {
            home: parse_odds(self.odds_home.as_deref()),
            draw: parse_odds(self.odds_draw.as_deref()),
            away: parse_odds(self.odds_away.as_deref()),
            over_2_5: parse_odds(self.odds_over.as_deref()),
            under_2_5: parse_odds(self.odds_under.as_deref()),
        }
    }

    pub fn stored_ratings(&self) -> Option<StoredRatings> {
        let home = parse_number(self.home_elo.as_deref())?;
        let away = parse_number(self.away_elo.as_deref())?;
        Some(StoredRatings { home, away })
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    let parsed: f64 = value?.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Goals must be whole and non-negative ("2" and "2.0" are both accepted)
fn parse_goals(value: Option<&str>) -> Option<u32> {
    let parsed = parse_number(value)?;
    if parsed >= 0.0 && parsed.fract() == 0.0 && parsed <= u32::MAX as f64 {
        Some(parsed as u32)
    } else {
        None
    }
}

fn parse_odds(value: Option<&str>) -> Option<f64> {
    parse_number(value).filter(|odds| *odds > 0.0)
}

/// Read raw rows from any CSV source
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(FootyError::MissingColumn(column.to_string()));
        }
    }
    for column in ["FTHG", "FTAG"] {
        if !headers.iter().any(|h| h == column) {
            log::warn!("Column {} not found, goals default to 0", column);
        }
    }

    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn read_rows_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    log::debug!("Reading {}", path.display());
    read_rows(File::open(path)?)
}

/// Round to two decimals (storage precision)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Two-decimal rounding printed in the shortest form: 2.20 -> "2.2", 3.0 -> "3"
pub fn format_decimal(value: f64) -> String {
    let mut text = format!("{:.2}", round2(value));
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_decimal).unwrap_or_default()
}

/// A feature record rendered for storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "HomeTeam")]
    pub home_team: String,
    #[serde(rename = "AwayTeam")]
    pub away_team: String,
    #[serde(rename = "FTHG")]
    pub home_goals: String,
    #[serde(rename = "FTAG")]
    pub away_goals: String,
    #[serde(rename = "FTR")]
    pub result: String,
    #[serde(rename = "AvgH")]
    pub odds_home: String,
    #[serde(rename = "AvgD")]
    pub odds_draw: String,
    #[serde(rename = "AvgA")]
    pub odds_away: String,
    #[serde(rename = "Avg>2.5")]
    pub odds_over: String,
    #[serde(rename = "Avg<2.5")]
    pub odds_under: String,
    #[serde(rename = "HomeTeamElo")]
    pub home_elo: String,
    #[serde(rename = "AwayTeamElo")]
    pub away_elo: String,
    #[serde(rename = "EloDifference")]
    pub elo_diff: String,
    #[serde(rename = "Home_AvgGoalsScored")]
    pub home_avg_scored: String,
    #[serde(rename = "Home_AvgGoalsConceded")]
    pub home_avg_conceded: String,
    #[serde(rename = "Home_Wins")]
    pub home_wins: String,
    #[serde(rename = "Home_Draws")]
    pub home_draws: String,
    #[serde(rename = "Home_Losses")]
    pub home_losses: String,
    #[serde(rename = "Away_AvgGoalsScored")]
    pub away_avg_scored: String,
    #[serde(rename = "Away_AvgGoalsConceded")]
    pub away_avg_conceded: String,
    #[serde(rename = "Away_Wins")]
    pub away_wins: String,
    #[serde(rename = "Away_Draws")]
    pub away_draws: String,
    #[serde(rename = "Away_Losses")]
    pub away_losses: String,
    #[serde(rename = "HTH_HomeWins")]
    pub h2h_home_wins: String,
    #[serde(rename = "HTH_AwayWins")]
    pub h2h_away_wins: String,
    #[serde(rename = "HTH_Draws")]
    pub h2h_draws: String,
    #[serde(rename = "HTH_AvgHomeGoals")]
    pub h2h_avg_home_goals: String,
    #[serde(rename = "HTH_AvgAwayGoals")]
    pub h2h_avg_away_goals: String,
}

impl From<&FeatureRecord> for FeatureRow {
    fn from(f: &FeatureRecord) -> Self {
        let m = &f.record;
        FeatureRow {
            date: m.date.format(CANONICAL_DATE_FORMAT).to_string(),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            home_goals: m.home_goals.to_string(),
            away_goals: m.away_goals.to_string(),
            result: m.result().code().to_string(),
            odds_home: format_optional(m.odds.home),
            odds_draw: format_optional(m.odds.draw),
            odds_away: format_optional(m.odds.away),
            odds_over: format_optional(m.odds.over_2_5),
            odds_under: format_optional(m.odds.under_2_5),
            home_elo: format_decimal(f.elo.home_elo),
            away_elo: format_decimal(f.elo.away_elo),
            elo_diff: format_decimal(f.elo.elo_diff),
            home_avg_scored: format_decimal(f.home_form.avg_goals_scored),
            home_avg_conceded: format_decimal(f.home_form.avg_goals_conceded),
            home_wins: f.home_form.wins.to_string(),
            home_draws: f.home_form.draws.to_string(),
            home_losses: f.home_form.losses.to_string(),
            away_avg_scored: format_decimal(f.away_form.avg_goals_scored),
            away_avg_conceded: format_decimal(f.away_form.avg_goals_conceded),
            away_wins: f.away_form.wins.to_string(),
            away_draws: f.away_form.draws.to_string(),
            away_losses: f.away_form.losses.to_string(),
            h2h_home_wins: f.h2h.a_wins.to_string(),
            h2h_away_wins: f.h2h.b_wins.to_string(),
            h2h_draws: f.h2h.draws.to_string(),
            h2h_avg_home_goals: format_decimal(f.h2h.avg_a_goals),
            h2h_avg_away_goals: format_decimal(f.h2h.avg_b_goals),
        }
    }
}

/// Stored columns plus the market view and labels of one match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub row: FeatureRow,
    pub implied: ImpliedProbabilities,
    pub targets: MatchTargets,
}

impl From<&FeatureRecord> for ReportRow {
    fn from(f: &FeatureRecord) -> Self {
        ReportRow {
            row: FeatureRow::from(f),
            implied: f.implied_probabilities(),
            targets: f.targets(),
        }
    }
}

impl FeatureRow {
    /// Cell values in `OUTPUT_COLUMNS` order
    pub fn cells(&self) -> [&str; 29] {
        [
            self.date.as_str(),
            self.home_team.as_str(),
            self.away_team.as_str(),
            self.home_goals.as_str(),
            self.away_goals.as_str(),
            self.result.as_str(),
            self.odds_home.as_str(),
            self.odds_draw.as_str(),
            self.odds_away.as_str(),
            self.odds_over.as_str(),
            self.odds_under.as_str(),
            self.home_elo.as_str(),
            self.away_elo.as_str(),
            self.elo_diff.as_str(),
            self.home_avg_scored.as_str(),
            self.home_avg_conceded.as_str(),
            self.home_wins.as_str(),
            self.home_draws.as_str(),
            self.home_losses.as_str(),
            self.away_avg_scored.as_str(),
            self.away_avg_conceded.as_str(),
            self.away_wins.as_str(),
            self.away_draws.as_str(),
            self.away_losses.as_str(),
            self.h2h_home_wins.as_str(),
            self.h2h_away_wins.as_str(),
            self.h2h_draws.as_str(),
            self.h2h_avg_home_goals.as_str(),
            self.h2h_avg_away_goals.as_str(),
        ]
    }

    /// Cell for a named column, or "" when the column is not part of the schema
    pub fn cell(&self, column: &str) -> &str {
        OUTPUT_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.cells()[i])
            .unwrap_or("")
    }
}

/// Write feature records with the standard header
pub fn write_features<W: Write>(writer: W, records: &[FeatureRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        wtr.write_record(FeatureRow::from(record).cells())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_features_to_path<P: AsRef<Path>>(path: P, records: &[FeatureRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_features(File::create(path)?, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,AvgH,AvgD,AvgA,Avg>2.5,Avg<2.5
E0,01/01/2020,Arsenal,Chelsea,2,0,H,2.10,3.40,3.50,1.90,1.95
E0,08/01/2020,Arsenal,Everton,x,1,A,,3.1,abc,-2,1.8
";

    #[test]
    fn test_read_rows_ignores_unknown_columns() {
        let rows = read_rows(SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date.as_deref(), Some("01/01/2020"));
        assert_eq!(
            rows[0].team_names(),
            Some(("Arsenal".to_string(), "Chelsea".to_string()))
        );
        assert_eq!(rows[0].odds().over_2_5, Some(1.90));
        assert!(rows[0].stored_ratings().is_none());
    }

    #[test]
    fn test_malformed_values_are_coerced() {
        let rows = read_rows(SAMPLE.as_bytes()).unwrap();
        let goals = rows[1].goals();
        assert_eq!((goals.home, goals.away), (0, 1));
        assert!(goals.coerced);

        let odds = rows[1].odds();
        assert_eq!(odds.home, None);
        assert_eq!(odds.draw, Some(3.1));
        assert_eq!(odds.away, None);
        assert_eq!(odds.over_2_5, None); // negative price
        assert!(!odds.is_complete());
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = "Date,HomeTeam,FTHG\n01/01/2020,Arsenal,1\n";
        match read_rows(csv.as_bytes()) {
            Err(FootyError::MissingColumn(column)) => assert_eq!(column, "AwayTeam"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_goal_columns_default_to_zero() {
        let csv = "Date,HomeTeam,AwayTeam\n01/01/2020,Arsenal,Chelsea\n";
        let rows = read_rows(csv.as_bytes()).unwrap();
        let goals = rows[0].goals();
        assert_eq!((goals.home, goals.away), (0, 0));
        assert!(goals.coerced);
    }

    #[test]
    fn test_goals_accept_decimal_text() {
        let row = RawRow {
            home_goals: Some("2.0".to_string()),
            away_goals: Some("1.5".to_string()),
            ..Default::default()
        };
        let goals = row.goals();
        assert_eq!(goals.home, 2);
        assert_eq!(goals.away, 0);
        assert!(goals.coerced);
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(2.2), "2.2");
        assert_eq!(format_decimal(3.0), "3");
        assert_eq!(format_decimal(1.234), "1.23");
        assert_eq!(format_decimal(1515.0), "1515");
        assert_eq!(format_decimal(1514.352_81), "1514.35");
        assert_eq!(format_decimal(-0.001), "0");
        assert_eq!(format_decimal(-30.0), "-30");
    }

    #[test]
    fn test_blank_team_is_rejected() {
        let row = RawRow {
            home_team: Some("  ".to_string()),
            away_team: Some("Chelsea".to_string()),
            ..Default::default()
        };
        assert!(row.team_names().is_none());
    }

    #[test]
    fn test_report_row_json_carries_market_and_labels() {
        let rows = read_rows(SAMPLE.as_bytes()).unwrap();
        let timeline =
            crate::data::Timeline::from_rows(rows, &crate::data::DateParser::default()).unwrap();
        let records = crate::data::dataset::scan(&timeline.matches, &Default::default());

        let json = serde_json::to_value(ReportRow::from(&records[0])).unwrap();
        assert_eq!(json["HomeTeamElo"], "1515");
        assert_eq!(json["targets"]["result"], "Home");
        assert_eq!(json["targets"]["over_2_5"], false);
        assert!(json["implied"]["outcome"].is_array());
        assert!(json["implied"]["margin"].as_f64().unwrap() > 0.0);

        // Incomplete prices leave the outcome market empty
        let json = serde_json::to_value(ReportRow::from(&records[1])).unwrap();
        assert!(json["implied"]["outcome"].is_null());
        assert_eq!(json["targets"]["result"], "Away");
    }
}
