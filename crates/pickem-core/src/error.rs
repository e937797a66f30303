// Engine error types.

use thiserror::Error;

/// Errors that stop a whole week's computation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no league shape available for league `{league}` season {season}")]
    MissingLeagueShape { league: String, season: i32 },

    #[error("invalid league shape: {message}")]
    InvalidShape { message: String },

    #[error("week {week} cannot be graded before week {missing} has been graded")]
    WeekOutOfOrder { week: u32, missing: u32 },

    #[error("week {week} cannot be regraded: week {last_graded} was built on it")]
    WeekSuperseded { week: u32, last_graded: u32 },
}

/// A single game that could not be used when summarizing a week.
///
/// Never fatal: the game is skipped and the rest of the week is still
/// summarized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("game #{index} in week {week} skipped: {reason}")]
pub struct IncompleteWeekError {
    /// Position of the game in the input list.
    pub index: usize,
    pub week: u32,
    pub reason: String,
}
