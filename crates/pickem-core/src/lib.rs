// Library root: the pick'em scoring engine. Pure functions over league
// results, prediction forms and standings; no I/O.

pub mod bracket;
pub mod error;
pub mod history;
pub mod league;
pub mod record;
pub mod results;
pub mod schedule;
pub mod scoring;
pub mod standings;
pub mod tiebreak;

pub use error::{EngineError, IncompleteWeekError};
pub use league::{LeagueShape, MatchupKey, MemberId, Ruleset, TeamId, WeekContext};
