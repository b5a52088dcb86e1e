//! League dataset files
//!
//! Each league is one featurised CSV under the dataset directory, named
//! `dataset_<league>.csv`. Leagues are addressed by display name
//! ("Premier League"), matched loosely against file stems.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::data::chronology::{DateParser, Timeline};
use crate::data::table::{self, FeatureRow};
use crate::features::FeatureRecord;
use crate::{FootyError, Result};

const FILE_PREFIX: &str = "dataset_";

/// Display name for a league file stem
///
/// Strips the `dataset_` prefix and a trailing `_1`, maps the big five to
/// their usual spelling, and title-cases anything else.
pub fn pretty_league_name(file_stem: &str) -> String {
    let name = file_stem.strip_prefix(FILE_PREFIX).unwrap_or(file_stem);
    let name = name.strip_suffix("_1").unwrap_or(name);
    let key = name.to_lowercase().replace('_', "");
    match key.as_str() {
        "seriea" => "Serie A".to_string(),
        "laliga" => "La Liga".to_string(),
        "premierleague" => "Premier League".to_string(),
        "bundesliga" => "Bundesliga".to_string(),
        "ligue1" => "Ligue 1".to_string(),
        _ => name
            .split('_')
            .filter(|w| !w.is_empty())
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Key used to match a display name against file stems
fn search_key(display_name: &str) -> String {
    display_name.to_lowercase().replace(' ', "")
}

/// Directory of league dataset files
#[derive(Debug, Clone)]
pub struct LeagueStore {
    dir: PathBuf,
}

impl LeagueStore {
    /// Open (and create if needed) the dataset directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(LeagueStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// CSV files in the directory, sorted by name
    fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |e| e == "csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn stem(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Display names of all leagues
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .files()?
            .iter()
            .map(|p| pretty_league_name(&Self::stem(p)))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Path of the file backing a display name
    pub fn resolve(&self, display_name: &str) -> Result<PathBuf> {
        let wanted = search_key(display_name);
        let files = self.files()?;
        let found = files.iter().find(|p| {
            Self::stem(p).to_lowercase().replace('_', "").contains(&wanted)
        });
        match found {
            Some(path) if !wanted.is_empty() => Ok(path.clone()),
            _ => Err(FootyError::LeagueNotFound {
                name: display_name.to_string(),
                available: files
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect(),
            }),
        }
    }

    /// Ordered history of a league
    pub fn load(&self, display_name: &str, parser: &DateParser) -> Result<Timeline> {
        let path = self.resolve(display_name)?;
        log::info!("Loading {} from {}", display_name, path.display());
        Timeline::from_path(path, parser)
    }

    /// File a new league would be created as
    pub fn path_for_new(&self, display_name: &str) -> PathBuf {
        let slug = display_name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_");
        self.dir.join(format!("{}{}.csv", FILE_PREFIX, slug))
    }

    /// Append derived rows to a league file
    ///
    /// Rows follow the file's own header; columns outside the output schema
    /// are left empty. A missing league is created with the standard header.
    pub fn append(&self, display_name: &str, records: &[FeatureRecord]) -> Result<PathBuf> {
        let path = match self.resolve(display_name) {
            Ok(path) => path,
            Err(FootyError::LeagueNotFound { .. }) => self.path_for_new(display_name),
            Err(e) => return Err(e),
        };

        let is_new = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if is_new {
            table::write_features_to_path(&path, records)?;
            log::info!("Created {} with {} rows", path.display(), records.len());
            return Ok(path);
        }

        let headers = csv::Reader::from_path(&path)?.headers()?.clone();
        let needs_newline = !ends_with_newline(&path)?;

        let mut file = OpenOptions::new().append(true).open(&path)?;
        if needs_newline {
            file.write_all(b"\n")?;
        }
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for record in records {
            let row = FeatureRow::from(record);
            wtr.write_record(headers.iter().map(|h| row.cell(h)))?;
        }
        wtr.flush()?;

        log::info!("Appended {} rows to {}", records.len(), path.display());
        Ok(path)
    }
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
