// Weekly results import from CSV exports.
//
// Layout under `data.results_dir`:
//   <season>/week_01.csv   one row per head-to-head game
//   <season>/teams.csv     one row per team: record, final standing, playoff log

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use pickem_core::bracket::{BracketTag, Outcome, PlayoffHistory};
use pickem_core::results::WeekGame;
use pickem_core::tiebreak::PlayoffWeek;
use pickem_core::TeamId;

use crate::providers::{TeamSnapshot, WeekResultsProvider};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// One game row. Team ids may be blank when the host could not resolve a
/// franchise; the engine skips those games. The round columns carry each
/// team's earlier playoff outcome codes (W, L, T, U for a bye).
#[derive(Debug, Deserialize)]
struct RawGame {
    team_a: Option<u32>,
    score_a: f64,
    team_b: Option<u32>,
    score_b: f64,
    #[serde(default)]
    bracket: Option<String>,
    #[serde(default)]
    a_round_one: Option<String>,
    #[serde(default)]
    a_round_two: Option<String>,
    #[serde(default)]
    b_round_one: Option<String>,
    #[serde(default)]
    b_round_two: Option<String>,
    #[serde(default)]
    seed_a: Option<u32>,
    #[serde(default)]
    seed_b: Option<u32>,
}

/// One team row. `playoff_outcomes` and `playoff_scores` are
/// semicolon-separated, one entry per playoff week played.
#[derive(Debug, Deserialize)]
struct RawTeam {
    team_id: u32,
    wins: u32,
    points_for: f64,
    #[serde(default)]
    final_standing: Option<u32>,
    #[serde(default)]
    playoff_outcomes: Option<String>,
    #[serde(default)]
    playoff_scores: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_bracket(raw: Option<&str>) -> Option<BracketTag> {
    match raw.map(|s| s.trim().to_uppercase()).as_deref() {
        None | Some("") | Some("NONE") => Some(BracketTag::None),
        Some("WINNERS_LADDER") => Some(BracketTag::WinnersLadder),
        Some("CONSOLATION_LADDER") => Some(BracketTag::ConsolationLadder),
        Some(_) => None,
    }
}

fn parse_outcome(raw: Option<&str>) -> Option<Outcome> {
    raw.filter(|s| !s.trim().is_empty()).and_then(Outcome::from_code)
}

fn history(round_one: Option<&str>, round_two: Option<&str>) -> PlayoffHistory {
    PlayoffHistory {
        round_one: parse_outcome(round_one),
        round_two: parse_outcome(round_two),
    }
}

fn split_list(raw: Option<&str>) -> Vec<&str> {
    raw.map(|s| {
        s.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<WeekGame>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for (line, result) in reader.deserialize::<RawGame>().enumerate() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed game row {}: {}", line + 1, e);
                continue;
            }
        };
        let Some(bracket) = parse_bracket(raw.bracket.as_deref()) else {
            warn!(
                "skipping game row {}: unknown bracket tag {:?}",
                line + 1,
                raw.bracket
            );
            continue;
        };
        games.push(WeekGame {
            team_a: raw.team_a.map(TeamId),
            team_b: raw.team_b.map(TeamId),
            score_a: raw.score_a,
            score_b: raw.score_b,
            bracket,
            history_a: history(raw.a_round_one.as_deref(), raw.a_round_two.as_deref()),
            history_b: history(raw.b_round_one.as_deref(), raw.b_round_two.as_deref()),
            seed_a: raw.seed_a,
            seed_b: raw.seed_b,
        });
    }
    Ok(games)
}

fn load_teams_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamSnapshot>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut teams: HashMap<u32, TeamSnapshot> = HashMap::new();
    for result in reader.deserialize::<RawTeam>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed team row: {}", e);
                continue;
            }
        };
        if !raw.points_for.is_finite() {
            warn!("skipping team {}: non-finite points_for", raw.team_id);
            continue;
        }

        let outcomes = split_list(raw.playoff_outcomes.as_deref());
        let scores = split_list(raw.playoff_scores.as_deref());
        if outcomes.len() != scores.len() {
            warn!(
                "team {}: {} playoff outcomes but {} scores; using the shorter list",
                raw.team_id,
                outcomes.len(),
                scores.len()
            );
        }
        let mut playoff_weeks = Vec::new();
        for (code, score) in outcomes.iter().zip(&scores) {
            match (Outcome::from_code(code), score.parse::<f64>()) {
                (Some(outcome), Ok(score)) if score.is_finite() => {
                    playoff_weeks.push(PlayoffWeek { outcome, score });
                }
                _ => {
                    warn!(
                        "team {}: unreadable playoff week {code:?}/{score:?}; ignoring the rest",
                        raw.team_id
                    );
                    break;
                }
            }
        }

        if teams.contains_key(&raw.team_id) {
            warn!("duplicate row for team {}, using latest", raw.team_id);
        }
        teams.insert(
            raw.team_id,
            TeamSnapshot {
                team: TeamId(raw.team_id),
                wins: raw.wins,
                points_for: raw.points_for,
                final_standing: raw.final_standing,
                playoff_weeks,
            },
        );
    }

    let mut teams: Vec<TeamSnapshot> = teams.into_values().collect();
    teams.sort_by_key(|t| t.team);
    Ok(teams)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load one week's games from a CSV file.
pub fn load_week_games(path: &Path) -> Result<Vec<WeekGame>, ResultsError> {
    let file = std::fs::File::open(path).map_err(|e| ResultsError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_games_from_reader(file).map_err(|e| ResultsError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the season's team lines from a CSV file.
pub fn load_team_snapshots(path: &Path) -> Result<Vec<TeamSnapshot>, ResultsError> {
    let file = std::fs::File::open(path).map_err(|e| ResultsError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_teams_from_reader(file).map_err(|e| ResultsError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Results provider reading the CSV layout described at the top of this
/// module.
pub struct CsvResults {
    root: PathBuf,
}

impl CsvResults {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn week_path(&self, season: i32, week: u32) -> PathBuf {
        self.root
            .join(season.to_string())
            .join(format!("week_{week:02}.csv"))
    }

    pub fn teams_path(&self, season: i32) -> PathBuf {
        self.root.join(season.to_string()).join("teams.csv")
    }
}

#[async_trait]
impl WeekResultsProvider for CsvResults {
    async fn week_games(&self, season: i32, week: u32) -> Result<Vec<WeekGame>> {
        let path = self.week_path(season, week);
        debug!("reading week {week} results from {}", path.display());
        Ok(load_week_games(&path)?)
    }

    async fn team_snapshots(&self, season: i32) -> Result<Vec<TeamSnapshot>> {
        Ok(load_team_snapshots(&self.teams_path(season))?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
