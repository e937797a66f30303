// Labelled game records kept for league history.

use serde::{Deserialize, Serialize};

use crate::bracket::{BracketTag, RoundInfo};
use crate::league::TeamId;
use crate::results::DecidedGame;

/// A counted game with its place in the season attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub season: i32,
    pub week: u32,
    pub winner: TeamId,
    pub loser: TeamId,
    pub winning_score: f64,
    pub losing_score: f64,
    pub playoffs: bool,
    /// Played on the consolation ladder.
    pub consolation: bool,
    pub quarterfinals: bool,
    pub semifinals: bool,
    pub finals: bool,
    /// Title game of its bracket. For the consolation ladder, the loser of
    /// this game finishes last.
    pub championship: bool,
    pub third_place: bool,
    pub winning_seed: Option<u32>,
    pub losing_seed: Option<u32>,
}

/// Attach season/round labels to one counted game.
pub fn label(season: i32, round: &RoundInfo, game: &DecidedGame) -> GameRecord {
    let consolation = round.is_playoff && game.bracket == BracketTag::ConsolationLadder;

    let (championship, third_place) = if consolation {
        (round.is_consolation_finals, false)
    } else if round.is_finals {
        let third = game.bracket == BracketTag::WinnersLadder;
        (!third, third)
    } else {
        (false, false)
    };

    let (winning_seed, losing_seed) = if round.is_playoff {
        (game.winner_seed, game.loser_seed)
    } else {
        (None, None)
    };

    GameRecord {
        season,
        week: round.week,
        winner: game.winner,
        loser: game.loser,
        winning_score: game.winning_score,
        losing_score: game.losing_score,
        playoffs: round.is_playoff,
        consolation,
        quarterfinals: round.is_quarterfinals,
        semifinals: round.is_semifinals,
        finals: round.is_finals,
        championship,
        third_place,
        winning_seed,
        losing_seed,
    }
}

/// Label every counted game of a week.
pub fn label_week(season: i32, round: &RoundInfo, games: &[DecidedGame]) -> Vec<GameRecord> {
    games.iter().map(|g| label(season, round, g)).collect()
}
