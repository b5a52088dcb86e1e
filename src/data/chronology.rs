//! Chronological ordering of raw match rows
//!
//! Every downstream computation indexes into the ordered history, so the
//! order produced here is the contract: ascending by parsed timestamp, ties
//! kept in input order. Position `k` is the cutoff unit; a computation at
//! cutoff `k` may only look at `matches[..k]`.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::data::table::{self, RawRow, StoredRatings};
use crate::{DataConfig, FootyError, MatchRecord, MatchResult, Result};

/// Strict formats tried in order before falling back to lenient parsing
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d/%m/%y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y-%m-%d %H:%M:%S",
];

/// Date representation written to output files
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extra layouts accepted per value by the lenient strategy
const LENIENT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d, %Y",
];

/// How the Date column of one batch is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateStrategy {
    /// A strict pattern that parsed more than half of the values
    Format(String),
    /// Per-value parsing with a day-first heuristic
    Lenient,
}

impl fmt::Display for DateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateStrategy::Format(format) => write!(f, "format {}", format),
            DateStrategy::Lenient => write!(f, "lenient day-first"),
        }
    }
}

/// Parse one value with a strict pattern
///
/// Date-only patterns yield midnight. `%Y` is rejected for years below
/// 1000 since chrono accepts short years there and "01/08/20" belongs to `%y`.
pub fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let parsed = NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    if format.contains("%Y") && parsed.year() < 1000 {
        return None;
    }
    Some(parsed)
}

/// Parse one value without a known format
pub fn parse_lenient(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = LENIENT_FORMATS
        .iter()
        .find_map(|format| parse_with_format(value, format))
    {
        return Some(dt);
    }
    parse_numeric_day_first(value)
}

/// Numeric dates with any separators, day before month unless impossible
fn parse_numeric_day_first(value: &str) -> Option<NaiveDateTime> {
    if value.chars().any(char::is_alphabetic) {
        return None;
    }
    let tokens: Vec<&str> = value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() < 3 || tokens.len() > 6 {
        return None;
    }
    let nums = tokens
        .iter()
        .map(|t| t.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;

    let (year, month, day) = if tokens[0].len() == 4 {
        (nums[0] as i32, nums[1], nums[2])
    } else {
        let year = expand_year(nums[2], tokens[2].len())?;
        if nums[1] > 12 && nums[0] <= 12 {
            (year, nums[0], nums[1])
        } else {
            (year, nums[1], nums[0])
        }
    };
    let hour = nums.get(3).copied().unwrap_or(0);
    let minute = nums.get(4).copied().unwrap_or(0);
    let second = nums.get(5).copied().unwrap_or(0);
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Two-digit years pivot at 69, as strptime's %y does
fn expand_year(year: u32, digits: usize) -> Option<i32> {
    match digits {
        4 => Some(year as i32),
        2 if year < 69 => Some(2000 + year as i32),
        2 => Some(1900 + year as i32),
        _ => None,
    }
}

/// Chooses and applies a date strategy per batch of rows
#[derive(Debug, Clone)]
pub struct DateParser {
    formats: Vec<String>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect())
    }
}

impl DateParser {
    pub fn new(formats: Vec<String>) -> Self {
        DateParser { formats }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(config.date_formats.clone())
    }

    /// First format that parses more than half of the non-empty values
    pub fn detect(&self, values: &[&str]) -> DateStrategy {
        let non_null: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        for format in &self.formats {
            let parsed = non_null
                .iter()
                .filter(|v| parse_with_format(v, format).is_some())
                .count();
            if parsed * 2 > non_null.len() {
                return DateStrategy::Format(format.clone());
            }
        }
        DateStrategy::Lenient
    }

    pub fn parse(&self, strategy: &DateStrategy, value: &str) -> Option<NaiveDateTime> {
        match strategy {
            DateStrategy::Format(format) => parse_with_format(value, format),
            DateStrategy::Lenient => parse_lenient(value),
        }
    }
}

/// Rows dropped or repaired while building a timeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub dropped_dates: usize,
    pub dropped_teams: usize,
    pub coerced_goals: usize,
    pub strategy: Option<DateStrategy>,
}

impl LoadReport {
    pub fn dropped(&self) -> usize {
        self.dropped_dates + self.dropped_teams
    }
}

/// Match history in chronological order
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub matches: Vec<MatchRecord>,
    /// Elo columns carried by each row, parallel to `matches`
    pub stored_ratings: Vec<Option<StoredRatings>>,
    pub report: LoadReport,
}

impl Timeline {
    /// Parse, clean and order a batch of raw rows
    pub fn from_rows(rows: Vec<RawRow>, parser: &DateParser) -> Result<Self> {
        let mut report = LoadReport {
            total_rows: rows.len(),
            ..Default::default()
        };
        if rows.is_empty() {
            return Ok(Timeline {
                report,
                ..Default::default()
            });
        }

        let strategy = {
            let values: Vec<&str> = rows
                .iter()
                .map(|r| r.date.as_deref().unwrap_or(""))
                .collect();
            parser.detect(&values)
        };
        match &strategy {
            DateStrategy::Format(format) => log::info!("Detected date format {}", format),
            DateStrategy::Lenient => {
                log::info!("No date format matched most rows, using lenient day-first parsing")
            }
        }

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let date = match row.date.as_deref().and_then(|v| parser.parse(&strategy, v)) {
                Some(date) => date,
                None => {
                    report.dropped_dates += 1;
                    continue;
                }
            };
            let (home_team, away_team) = match row.team_names() {
                Some(names) => names,
                None => {
                    report.dropped_teams += 1;
                    continue;
                }
            };
            let goals = row.goals();
            if goals.coerced {
                report.coerced_goals += 1;
                log::debug!(
                    "Coerced goals to {}-{} for {} v {} on {}",
                    goals.home,
                    goals.away,
                    home_team,
                    away_team,
                    date
                );
            }
            let record = MatchRecord {
                date,
                home_team,
                away_team,
                home_goals: goals.home,
                away_goals: goals.away,
                odds: row.odds(),
            };
            if let Some(stated) = row.result.as_deref().and_then(MatchResult::from_code) {
                if stated != record.result() {
                    log::debug!(
                        "FTR {} disagrees with score {}-{} for {} v {}, using the score",
                        stated.code(),
                        record.home_goals,
                        record.away_goals,
                        record.home_team,
                        record.away_team
                    );
                }
            }
            entries.push((record, row.stored_ratings()));
        }

        if report.dropped_dates == report.total_rows {
            return Err(FootyError::UnparseableDates {
                total: report.total_rows,
            });
        }
        if report.dropped_dates > 0 {
            log::warn!(
                "Dropped {} of {} rows with unparseable dates",
                report.dropped_dates,
                report.total_rows
            );
        }
        if report.dropped_teams > 0 {
            log::warn!("Dropped {} rows without both team names", report.dropped_teams);
        }
        if report.coerced_goals > 0 {
            log::warn!(
                "{} rows had missing or malformed goals, counted as 0",
                report.coerced_goals
            );
        }

        entries.sort_by_key(|(record, _)| record.date);
        let (matches, stored_ratings): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        report.strategy = Some(strategy);
        Ok(Timeline {
            matches,
            stored_ratings,
            report,
        })
    }

    /// Order already parsed matches (no stored ratings)
    pub fn from_matches(mut matches: Vec<MatchRecord>) -> Self {
        matches.sort_by_key(|m| m.date);
        let stored_ratings = vec![None; matches.len()];
        Timeline {
            report: LoadReport {
                total_rows: matches.len(),
                ..Default::default()
            },
            matches,
            stored_ratings,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, parser: &DateParser) -> Result<Self> {
        Self::from_rows(table::read_rows_from_path(path)?, parser)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Matches visible at cutoff `k`
    pub fn before(&self, k: usize) -> &[MatchRecord] {
        &self.matches[..k.min(self.matches.len())]
    }

    /// True when every row carries its own Elo columns
    pub fn has_stored_ratings(&self) -> bool {
        !self.stored_ratings.is_empty() && self.stored_ratings.iter().all(Option::is_some)
    }

    /// Sorted unique team names
    pub fn teams(&self) -> Vec<String> {
        let mut teams: Vec<String> = self
            .matches
            .iter()
            .flat_map(|m| [m.home_team.clone(), m.away_team.clone()])
            .collect();
        teams.sort();
        teams.dedup();
        teams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, home: &str, away: &str, hg: &str, ag: &str) -> RawRow {
        RawRow {
            date: Some(date.to_string()),
            home_team: Some(home.to_string()),
            away_team: Some(away.to_string()),
            home_goals: Some(hg.to_string()),
            away_goals: Some(ag.to_string()),
            ..Default::default()
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_detects_majority_format() {
        let parser = DateParser::default();
        let strategy = parser.detect(&["13/08/2022", "20/08/2022", "2022-08-27", ""]);
        assert_eq!(strategy, DateStrategy::Format("%d/%m/%Y".to_string()));
    }

    #[test]
    fn test_short_years_use_two_digit_format() {
        let parser = DateParser::default();
        let strategy = parser.detect(&["13/08/22", "20/08/22"]);
        assert_eq!(strategy, DateStrategy::Format("%d/%m/%y".to_string()));
        assert_eq!(parser.parse(&strategy, "13/08/22"), Some(ymd(2022, 8, 13)));
    }

    #[test]
    fn test_no_majority_falls_back_to_lenient() {
        let parser = DateParser::new(vec!["%Y-%m-%d".to_string()]);
        let strategy = parser.detect(&["11/08/2023 19:00", "2023-08-12", "19.08.2023"]);
        assert_eq!(strategy, DateStrategy::Lenient);
        assert_eq!(
            parser.parse(&strategy, "11/08/2023 19:00"),
            NaiveDate::from_ymd_opt(2023, 8, 11)
                .unwrap()
                .and_hms_opt(19, 0, 0)
        );
        assert_eq!(parser.parse(&strategy, "19.08.2023"), Some(ymd(2023, 8, 19)));
    }

    #[test]
    fn test_lenient_is_day_first() {
        assert_eq!(parse_lenient("03/04/2021"), Some(ymd(2021, 4, 3)));
        // Day-first impossible, so month-first
        assert_eq!(parse_lenient("04/23/2021"), Some(ymd(2021, 4, 23)));
        assert_eq!(parse_lenient("5 Aug 2023"), Some(ymd(2023, 8, 5)));
        assert_eq!(parse_lenient("not a date"), None);
        assert_eq!(parse_lenient("31/02/2021"), None);
    }

    #[test]
    fn test_ordering_is_stable_and_drops_bad_rows() {
        let rows = vec![
            row("02/01/2020", "C", "D", "1", "0"),
            row("01/01/2020", "A", "B", "2", "2"),
            row("garbage", "E", "F", "0", "0"),
            row("02/01/2020", "E", "F", "x", "1"),
            row("01/01/2020", "", "B", "1", "1"),
        ];
        let timeline = Timeline::from_rows(rows, &DateParser::default()).unwrap();
        let order: Vec<&str> = timeline.matches.iter().map(|m| m.home_team.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "E"]);
        assert_eq!(timeline.report.dropped_dates, 1);
        assert_eq!(timeline.report.dropped_teams, 1);
        assert_eq!(timeline.report.coerced_goals, 1);
        assert_eq!(timeline.report.dropped(), 2);
        assert_eq!(timeline.matches[2].home_goals, 0);
        assert_eq!(timeline.stored_ratings.len(), 3);
        assert!(!timeline.has_stored_ratings());
    }

    #[test]
    fn test_all_dates_unparseable_is_fatal() {
        let rows = vec![row("??", "A", "B", "1", "0"), row("", "C", "D", "0", "0")];
        match Timeline::from_rows(rows, &DateParser::default()) {
            Err(FootyError::UnparseableDates { total }) => assert_eq!(total, 2),
            other => panic!("expected UnparseableDates, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_empty_input_is_empty_timeline() {
        let timeline = Timeline::from_rows(Vec::new(), &DateParser::default()).unwrap();
        assert!(timeline.is_empty());
        assert!(timeline.teams().is_empty());
    }

    #[test]
    fn test_cutoff_slices() {
        let rows = vec![
            row("01/01/2020", "A", "B", "1", "0"),
            row("02/01/2020", "B", "C", "1", "0"),
        ];
        let timeline = Timeline::from_rows(rows, &DateParser::default()).unwrap();
        assert!(timeline.before(0).is_empty());
        assert_eq!(timeline.before(1).len(), 1);
        assert_eq!(timeline.before(10).len(), 2);
        assert_eq!(timeline.teams(), vec!["A", "B", "C"]);
    }
}
