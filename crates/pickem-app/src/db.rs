// SQLite persistence layer for prediction forms, standings and game history.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use pickem_core::record::GameRecord;
use pickem_core::scoring::PredictionForm;
use pickem_core::standings::StandingsRow;
use pickem_core::{MemberId, TeamId};

/// SQLite-backed persistence for prediction forms, weekly standings,
/// labelled game records, and which weeks have been graded.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS predictions (
                season       INTEGER NOT NULL,
                week         INTEGER NOT NULL,
                member_id    INTEGER NOT NULL,
                form         TEXT NOT NULL,
                submitted_at TEXT NOT NULL,
                PRIMARY KEY (season, week, member_id)
            );

            CREATE TABLE IF NOT EXISTS standings (
                season                 INTEGER NOT NULL,
                week                   INTEGER NOT NULL,
                member_id              INTEGER NOT NULL,
                cumulative_total       INTEGER NOT NULL,
                dropped_low_week_value INTEGER,
                week_total             INTEGER NOT NULL,
                PRIMARY KEY (season, week, member_id)
            );

            CREATE TABLE IF NOT EXISTS game_records (
                season        INTEGER NOT NULL,
                week          INTEGER NOT NULL,
                winner        INTEGER NOT NULL,
                loser         INTEGER NOT NULL,
                winning_score REAL NOT NULL,
                losing_score  REAL NOT NULL,
                playoffs      INTEGER NOT NULL,
                consolation   INTEGER NOT NULL,
                quarterfinals INTEGER NOT NULL,
                semifinals    INTEGER NOT NULL,
                finals        INTEGER NOT NULL,
                championship  INTEGER NOT NULL,
                third_place   INTEGER NOT NULL,
                winning_seed  INTEGER,
                losing_seed   INTEGER,
                PRIMARY KEY (season, week, winner, loser)
            );

            CREATE TABLE IF NOT EXISTS graded_weeks (
                season    INTEGER NOT NULL,
                week      INTEGER NOT NULL,
                graded_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (season, week)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Prediction forms
    // ------------------------------------------------------------------

    /// Store a member's form for a week. A resubmission overwrites the
    /// previous form.
    pub fn save_prediction(&self, season: i32, form: &PredictionForm) -> Result<()> {
        let conn = self.conn();
        let json = serde_json::to_string(form).context("failed to serialize prediction form")?;
        conn.execute(
            "INSERT INTO predictions (season, week, member_id, form, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(season, week, member_id) DO UPDATE SET
                form         = excluded.form,
                submitted_at = excluded.submitted_at",
            params![
                season,
                form.week,
                form.member.0,
                json,
                form.submitted_at.to_rfc3339(),
            ],
        )
        .context("failed to save prediction form")?;
        Ok(())
    }

    /// Load every stored form for a week, ordered by member id.
    pub fn load_predictions(&self, season: i32, week: u32) -> Result<Vec<PredictionForm>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT form FROM predictions
                 WHERE season = ?1 AND week = ?2 ORDER BY member_id",
            )
            .context("failed to prepare load_predictions query")?;

        let rows = stmt
            .query_map(params![season, week], |row| row.get::<_, String>(0))
            .context("failed to query predictions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read prediction rows")?;

        rows.iter()
            .map(|json| {
                serde_json::from_str::<PredictionForm>(json)
                    .context("failed to deserialize prediction form")
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Standings
    // ------------------------------------------------------------------

    /// Standings rows for a week, ordered by member id.
    pub fn load_standings(&self, season: i32, week: u32) -> Result<Vec<StandingsRow>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT member_id, week, cumulative_total, dropped_low_week_value, week_total
                 FROM standings WHERE season = ?1 AND week = ?2 ORDER BY member_id",
            )
            .context("failed to prepare load_standings query")?;

        let rows = stmt
            .query_map(params![season, week], |row| {
                Ok(StandingsRow {
                    member: MemberId(row.get(0)?),
                    week: row.get(1)?,
                    cumulative_total: row.get(2)?,
                    dropped_low_week_value: row.get(3)?,
                    week_total: row.get(4)?,
                })
            })
            .context("failed to query standings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map standings rows")?;

        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Game records
    // ------------------------------------------------------------------

    /// Every stored game record, oldest first.
    pub fn load_game_records(&self) -> Result<Vec<GameRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT season, week, winner, loser, winning_score, losing_score,
                        playoffs, consolation, quarterfinals, semifinals, finals,
                        championship, third_place, winning_seed, losing_seed
                 FROM game_records ORDER BY season, week, winner",
            )
            .context("failed to prepare load_game_records query")?;

        let records = stmt
            .query_map([], game_record_from_row)
            .context("failed to query game records")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game record rows")?;

        Ok(records)
    }

    // ------------------------------------------------------------------
    // Graded weeks
    // ------------------------------------------------------------------

    /// Highest graded week of the season, if any.
    pub fn last_graded_week(&self, season: i32) -> Result<Option<u32>> {
        let conn = self.conn();
        let week: Option<u32> = conn
            .query_row(
                "SELECT MAX(week) FROM graded_weeks WHERE season = ?1",
                params![season],
                |row| row.get(0),
            )
            .context("failed to read last graded week")?;
        Ok(week)
    }

    /// Persist a graded week in one transaction: its standings rows, its
    /// labelled game records (replacing any from an earlier grading), and
    /// the graded marker.
    pub fn commit_week(
        &self,
        season: i32,
        week: u32,
        rows: &[StandingsRow],
        records: &[GameRecord],
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin commit_week transaction")?;

        for row in rows {
            tx.execute(
                "INSERT INTO standings
                    (season, week, member_id, cumulative_total, dropped_low_week_value, week_total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(season, week, member_id) DO UPDATE SET
                    cumulative_total       = excluded.cumulative_total,
                    dropped_low_week_value = excluded.dropped_low_week_value,
                    week_total             = excluded.week_total",
                params![
                    season,
                    week,
                    row.member.0,
                    row.cumulative_total,
                    row.dropped_low_week_value,
                    row.week_total,
                ],
            )
            .context("failed to upsert standings row")?;
        }

        tx.execute(
            "DELETE FROM game_records WHERE season = ?1 AND week = ?2",
            params![season, week],
        )
        .context("failed to clear previous game records")?;
        for r in records {
            tx.execute(
                "INSERT INTO game_records
                    (season, week, winner, loser, winning_score, losing_score,
                     playoffs, consolation, quarterfinals, semifinals, finals,
                     championship, third_place, winning_seed, losing_seed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    r.season,
                    r.week,
                    r.winner.0,
                    r.loser.0,
                    r.winning_score,
                    r.losing_score,
                    r.playoffs,
                    r.consolation,
                    r.quarterfinals,
                    r.semifinals,
                    r.finals,
                    r.championship,
                    r.third_place,
                    r.winning_seed,
                    r.losing_seed,
                ],
            )
            .context("failed to insert game record")?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO graded_weeks (season, week) VALUES (?1, ?2)",
            params![season, week],
        )
        .context("failed to mark week graded")?;

        tx.commit().context("failed to commit graded week")?;
        Ok(())
    }
}

fn game_record_from_row(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        season: row.get(0)?,
        week: row.get(1)?,
        winner: TeamId(row.get(2)?),
        loser: TeamId(row.get(3)?),
        winning_score: row.get(4)?,
        losing_score: row.get(5)?,
        playoffs: row.get(6)?,
        consolation: row.get(7)?,
        quarterfinals: row.get(8)?,
        semifinals: row.get(9)?,
        finals: row.get(10)?,
        championship: row.get(11)?,
        third_place: row.get(12)?,
        winning_seed: row.get(13)?,
        losing_seed: row.get(14)?,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const SEASON: i32 = 2023;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_form(member: u32, week: u32, minute: u32) -> PredictionForm {
        let mut form = PredictionForm::blank(
            MemberId(member),
            week,
            Utc.with_ymd_and_hms(2023, 9, 7, 18, minute, 0).unwrap(),
        );
        form.picked_winners.insert(TeamId(3));
        form.exact_high_guess = Some("141.9".into());
        form
    }

    fn row(member: u32, week: u32, total: u32) -> StandingsRow {
        StandingsRow {
            member: MemberId(member),
            week,
            cumulative_total: total,
            dropped_low_week_value: Some(1),
            week_total: total,
        }
    }

    fn record(week: u32, winner: u32, loser: u32) -> GameRecord {
        GameRecord {
            season: SEASON,
            week,
            winner: TeamId(winner),
            loser: TeamId(loser),
            winning_score: 120.5,
            losing_score: 99.25,
            playoffs: week > 14,
            consolation: false,
            quarterfinals: false,
            semifinals: false,
            finals: false,
            championship: false,
            third_place: false,
            winning_seed: None,
            losing_seed: Some(4),
        }
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_in_memory_creates_tables() {
        let db = test_db();
        let conn = db.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('predictions', 'standings', 'game_records', 'graded_weeks')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }

    // ------------------------------------------------------------------
    // Predictions
    // ------------------------------------------------------------------

    #[test]
    fn prediction_round_trips_through_json() {
        let db = test_db();
        let form = sample_form(1, 3, 0);
        db.save_prediction(SEASON, &form).unwrap();

        let loaded = db.load_predictions(SEASON, 3).unwrap();
        assert_eq!(loaded, vec![form]);
        assert!(db.load_predictions(SEASON, 4).unwrap().is_empty());
        assert!(db.load_predictions(2022, 3).unwrap().is_empty());
    }

    #[test]
    fn resubmission_overwrites() {
        let db = test_db();
        db.save_prediction(SEASON, &sample_form(1, 3, 0)).unwrap();
        let mut second = sample_form(1, 3, 30);
        second.exact_high_guess = Some("150".into());
        db.save_prediction(SEASON, &second).unwrap();

        let loaded = db.load_predictions(SEASON, 3).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].exact_high_guess.as_deref(), Some("150"));
    }

    // ------------------------------------------------------------------
    // commit_week
    // ------------------------------------------------------------------

    #[test]
    fn commit_week_stores_rows_records_and_marker() {
        let db = test_db();
        assert_eq!(db.last_graded_week(SEASON).unwrap(), None);

        db.commit_week(SEASON, 1, &[row(2, 1, 5), row(1, 1, 3)], &[record(1, 4, 7)])
            .unwrap();

        let rows = db.load_standings(SEASON, 1).unwrap();
        assert_eq!(rows, vec![row(1, 1, 3), row(2, 1, 5)]);
        assert_eq!(db.load_game_records().unwrap(), vec![record(1, 4, 7)]);
        assert_eq!(db.last_graded_week(SEASON).unwrap(), Some(1));
    }

    #[test]
    fn regrading_a_week_replaces_its_records() {
        let db = test_db();
        db.commit_week(SEASON, 2, &[row(1, 2, 3)], &[record(2, 1, 2), record(2, 3, 4)])
            .unwrap();
        db.commit_week(SEASON, 2, &[row(1, 2, 6)], &[record(2, 2, 1)])
            .unwrap();

        assert_eq!(db.load_standings(SEASON, 2).unwrap()[0].cumulative_total, 6);
        assert_eq!(db.load_game_records().unwrap(), vec![record(2, 2, 1)]);
    }

    #[test]
    fn graded_weeks_are_per_season() {
        let db = test_db();
        db.commit_week(2022, 17, &[], &[]).unwrap();
        db.commit_week(SEASON, 2, &[], &[]).unwrap();
        assert_eq!(db.last_graded_week(2022).unwrap(), Some(17));
        assert_eq!(db.last_graded_week(SEASON).unwrap(), Some(2));
        assert_eq!(db.last_graded_week(2021).unwrap(), None);
    }
}
