//! Football feature derivation CLI
//!
//! Builds leakage-free match features from results files and maintains
//! per-league dataset files.

use clap::{Parser, Subcommand};
use footy::{Config, Result};

#[derive(Parser)]
#[command(name = "footy")]
#[command(
    about = "Leakage-free feature derivation for football match prediction",
    long_about = None
)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Derive features for a full results file
    Featurize {
        /// Raw results CSV
        input: String,
        /// Output CSV
        output: String,
    },
    /// Derive features for newly uploaded matches of a league
    Append {
        /// League display name, e.g. "Premier League"
        #[arg(long)]
        league: String,
        /// CSV with the new matches
        upload: String,
        /// Append the new rows to the league file
        #[arg(long)]
        save: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show features for a fixture between two teams
    Features {
        #[arg(long)]
        league: String,
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Decimal odds: home,draw,away,over2.5,under2.5
        #[arg(long)]
        odds: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show recent form and latest rating of a team
    Team {
        #[arg(long)]
        league: String,
        team: String,
    },
    /// List the teams of a league
    Teams {
        #[arg(long)]
        league: String,
    },
    /// List available leagues
    Leagues,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Featurize { input, output } => commands::featurize(&config, &input, &output),
        Commands::Append {
            league,
            upload,
            save,
            format,
        } => commands::append(&config, &league, &upload, save, format),
        Commands::Features {
            league,
            home,
            away,
            odds,
            format,
        } => commands::features(&config, &league, &home, &away, odds.as_deref(), format),
        Commands::Team { league, team } => commands::team(&config, &league, &team),
        Commands::Teams { league } => commands::teams(&config, &league),
        Commands::Leagues => commands::leagues(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use footy::data::dataset::{derive_batch, derive_incremental_rows};
    use footy::data::table::{self, ReportRow};
    use footy::data::{DateParser, LeagueStore};
    use footy::features::FeatureRecord;
    use footy::predict::lookup::{self, format_fixture};
    use footy::{FootyError, Odds};

    fn open_store(config: &Config) -> Result<LeagueStore> {
        LeagueStore::open(&config.data.dataset_dir)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.dataset_dir)?;
        println!("Created {}/ directory", config.data.dataset_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!(
            "  2. Run 'footy featurize results.csv {}/dataset_<league>.csv'",
            config.data.dataset_dir
        );
        println!("  3. Run 'footy append --league \"<league>\" new.csv --save' for new matches");
        println!("  4. Run 'footy features --league \"<league>\" \"Team A\" \"Team B\"'");

        Ok(())
    }

    pub fn featurize(config: &Config, input: &str, output: &str) -> Result<()> {
        let parser = DateParser::from_config(&config.data);
        let rows = table::read_rows_from_path(input)?;
        let batch = derive_batch(rows, &parser, &config.engine)?;
        table::write_features_to_path(output, &batch.records)?;

        let report = &batch.report;
        println!("Wrote {} rows to {}", batch.records.len(), output);
        if let Some(strategy) = &report.strategy {
            println!("  Dates:   {}", strategy);
        }
        if report.dropped() > 0 {
            println!(
                "  Dropped: {} ({} bad dates, {} missing teams)",
                report.dropped(),
                report.dropped_dates,
                report.dropped_teams
            );
        }
        if report.coerced_goals > 0 {
            println!("  Goals coerced to 0: {}", report.coerced_goals);
        }
        Ok(())
    }

    pub fn append(
        config: &Config,
        league: &str,
        upload: &str,
        save: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let store = open_store(config)?;
        let parser = DateParser::from_config(&config.data);
        let existing = match store.load(league, &parser) {
            Ok(timeline) => timeline,
            Err(FootyError::LeagueNotFound { .. }) if save => {
                log::info!("League {} not found, starting a new file", league);
                Default::default()
            }
            Err(e) => return Err(e),
        };

        let rows = table::read_rows_from_path(upload)?;
        let out = derive_incremental_rows(&existing, rows, &parser, &config.engine)?;
        print_records(&out.records, &format)?;

        if out.duplicates > 0 {
            eprintln!("{} uploaded matches were already in the dataset", out.duplicates);
        }
        if save && !out.records.is_empty() {
            let path = store.append(league, &out.records)?;
            eprintln!("Saved {} new rows to {}", out.records.len(), path.display());
        }
        Ok(())
    }

    fn print_records(records: &[FeatureRecord], format: &OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Table => {
                if records.is_empty() {
                    println!("No new matches");
                    return Ok(());
                }
                println!(
                    "{:<20} {:<18} {:<18} {:>5} {:>8} {:>8} {:>8} {:>17} {:>3} {:>4} {:>4}",
                    "Date",
                    "Home",
                    "Away",
                    "Score",
                    "HomeElo",
                    "AwayElo",
                    "EloDiff",
                    "Market H/D/A",
                    "FTR",
                    "O2.5",
                    "BTTS"
                );
                for record in records {
                    let ReportRow {
                        row,
                        implied,
                        targets,
                    } = ReportRow::from(record);
                    let market = match implied.outcome {
                        Some((h, d, a)) => {
                            format!("{:.0}/{:.0}/{:.0}%", h * 100.0, d * 100.0, a * 100.0)
                        }
                        None => "-".to_string(),
                    };
                    println!(
                        "{:<20} {:<18} {:<18} {:>5} {:>8} {:>8} {:>8} {:>17} {:>3} {:>4} {:>4}",
                        row.date,
                        row.home_team,
                        row.away_team,
                        format!("{}-{}", row.home_goals, row.away_goals),
                        row.home_elo,
                        row.away_elo,
                        row.elo_diff,
                        market,
                        targets.result.code(),
                        yes_no(targets.over_2_5),
                        yes_no(targets.both_teams_scored)
                    );
                }
            }
            OutputFormat::Json => {
                let rows: Vec<ReportRow> = records.iter().map(ReportRow::from).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            OutputFormat::Csv => {
                table::write_features(std::io::stdout().lock(), records)?;
            }
        }
        Ok(())
    }

    fn yes_no(flag: bool) -> &'static str {
        if flag {
            "yes"
        } else {
            "no"
        }
    }

    fn parse_odds(text: &str) -> Result<Odds> {
        let values = text
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|o| *o > 0.0)
                    .ok_or_else(|| FootyError::Parse(format!("Invalid odds value: {}", v)))
            })
            .collect::<Result<Vec<f64>>>()?;
        match values.as_slice() {
            [home, draw, away, over, under] => Ok(Odds {
                home: Some(*home),
                draw: Some(*draw),
                away: Some(*away),
                over_2_5: Some(*over),
                under_2_5: Some(*under),
            }),
            _ => Err(FootyError::Parse(format!(
                "Expected 5 odds (home,draw,away,over,under), got {}",
                values.len()
            ))),
        }
    }

    pub fn features(
        config: &Config,
        league: &str,
        home: &str,
        away: &str,
        odds: Option<&str>,
        format: OutputFormat,
    ) -> Result<()> {
        let store = open_store(config)?;
        let timeline = store.load(league, &DateParser::from_config(&config.data))?;

        let mut fixture = lookup::fixture_features(&timeline, home, away, &config.engine);
        if let Some(text) = odds {
            fixture = fixture.with_odds(parse_odds(text)?);
        }

        match format {
            OutputFormat::Table => {
                print!("{}", format_fixture(&fixture));
                if let Some(vector) = fixture.model_vector() {
                    println!("\nModel input ({} values):", vector.len());
                    for (name, value) in footy::features::FEATURE_COLUMNS.iter().zip(&vector) {
                        println!("  {:<24}{}", name, table::format_decimal(*value));
                    }
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "home": fixture.home_team,
                    "away": fixture.away_team,
                    "features": fixture.derived,
                    "implied": fixture.implied_probabilities(),
                    "model_vector": fixture.model_vector(),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                let vector = fixture.derived.to_vec();
                let columns = &footy::features::FEATURE_COLUMNS[5..];
                println!("HomeTeam,AwayTeam,{}", columns.join(","));
                let values: Vec<String> =
                    vector.iter().map(|v| table::format_decimal(*v)).collect();
                println!("{},{},{}", home, away, values.join(","));
            }
        }
        Ok(())
    }

    pub fn team(config: &Config, league: &str, team: &str) -> Result<()> {
        let store = open_store(config)?;
        let timeline = store.load(league, &DateParser::from_config(&config.data))?;
        let summary = lookup::team_summary(&timeline, team, &config.engine)?;
        let form = &summary.recent;

        println!("{}", summary.team);
        println!("───────────────────────────────");
        println!("  Elo:        {}", table::format_decimal(summary.last_rating));
        println!(
            "  Last {}:     {}W {}D {}L",
            form.matches, form.wins, form.draws, form.losses
        );
        println!("  Scored:     {} per match", table::format_decimal(form.avg_goals_scored));
        println!("  Conceded:   {} per match", table::format_decimal(form.avg_goals_conceded));
        Ok(())
    }

    pub fn teams(config: &Config, league: &str) -> Result<()> {
        let store = open_store(config)?;
        let timeline = store.load(league, &DateParser::from_config(&config.data))?;
        for team in lookup::teams(&timeline) {
            println!("{}", team);
        }
        Ok(())
    }

    pub fn leagues(config: &Config) -> Result<()> {
        let store = open_store(config)?;
        let leagues = store.list()?;
        if leagues.is_empty() {
            println!("No league files in {}", store.dir().display());
        }
        for league in leagues {
            println!("{}", league);
        }
        Ok(())
    }
}
