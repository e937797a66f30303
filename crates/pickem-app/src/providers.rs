// Collaborator seams for the grading pipeline, with the implementations
// backed by the config file and the SQLite database.

use anyhow::Result;
use async_trait::async_trait;

use pickem_core::record::GameRecord;
use pickem_core::results::WeekGame;
use pickem_core::scoring::PredictionForm;
use pickem_core::standings::StandingsRow;
use pickem_core::tiebreak::PlayoffWeek;
use pickem_core::{LeagueShape, TeamId};

use crate::config::Config;
use crate::db::Database;

/// A team's season line as reported by the league host.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSnapshot {
    pub team: TeamId,
    /// Regular-season wins and points. Hosts leave playoff weeks out.
    pub wins: u32,
    pub points_for: f64,
    pub final_standing: Option<u32>,
    /// Playoff weeks played so far, round one first.
    pub playoff_weeks: Vec<PlayoffWeek>,
}

#[async_trait]
pub trait LeagueShapeProvider: Send + Sync {
    /// The league's bracket structure for `season`, if the host has
    /// published it.
    async fn league_shape(&self, season: i32) -> Result<Option<LeagueShape>>;
}

#[async_trait]
pub trait WeekResultsProvider: Send + Sync {
    async fn week_games(&self, season: i32, week: u32) -> Result<Vec<WeekGame>>;

    async fn team_snapshots(&self, season: i32) -> Result<Vec<TeamSnapshot>>;
}

#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn save_form(&self, season: i32, form: &PredictionForm) -> Result<()>;

    async fn forms_for_week(&self, season: i32, week: u32) -> Result<Vec<PredictionForm>>;
}

#[async_trait]
pub trait StandingsStore: Send + Sync {
    async fn standings(&self, season: i32, week: u32) -> Result<Vec<StandingsRow>>;

    async fn last_graded_week(&self, season: i32) -> Result<Option<u32>>;

    async fn game_records(&self) -> Result<Vec<GameRecord>>;

    /// Persist a graded week atomically.
    async fn commit_week(
        &self,
        season: i32,
        week: u32,
        rows: &[StandingsRow],
        records: &[GameRecord],
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl LeagueShapeProvider for Config {
    async fn league_shape(&self, season: i32) -> Result<Option<LeagueShape>> {
        if season != self.league.season {
            return Ok(None);
        }
        Ok(self.league.shape)
    }
}

#[async_trait]
impl PredictionStore for Database {
    async fn save_form(&self, season: i32, form: &PredictionForm) -> Result<()> {
        self.save_prediction(season, form)
    }

    async fn forms_for_week(&self, season: i32, week: u32) -> Result<Vec<PredictionForm>> {
        self.load_predictions(season, week)
    }
}

#[async_trait]
impl StandingsStore for Database {
    async fn standings(&self, season: i32, week: u32) -> Result<Vec<StandingsRow>> {
        self.load_standings(season, week)
    }

    async fn last_graded_week(&self, season: i32) -> Result<Option<u32>> {
        Database::last_graded_week(self, season)
    }

    async fn game_records(&self) -> Result<Vec<GameRecord>> {
        self.load_game_records()
    }

    async fn commit_week(
        &self,
        season: i32,
        week: u32,
        rows: &[StandingsRow],
        records: &[GameRecord],
    ) -> Result<()> {
        Database::commit_week(self, season, week, rows, records)
    }
}
