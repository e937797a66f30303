// Weekly result extraction: winners, blowout, closest, highest and lowest.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bracket::{admit, BracketTag, PlayoffHistory, RoundInfo};
use crate::error::IncompleteWeekError;
use crate::league::{MatchupKey, TeamId};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One head-to-head result as delivered by the weekly results provider.
///
/// Either side may be missing when the provider could not resolve a team
/// (e.g. an unowned franchise); such games are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekGame {
    pub team_a: Option<TeamId>,
    pub team_b: Option<TeamId>,
    pub score_a: f64,
    pub score_b: f64,
    #[serde(default)]
    pub bracket: BracketTag,
    #[serde(default)]
    pub history_a: PlayoffHistory,
    #[serde(default)]
    pub history_b: PlayoffHistory,
    /// Playoff seeds, when the provider reports them.
    #[serde(default)]
    pub seed_a: Option<u32>,
    #[serde(default)]
    pub seed_b: Option<u32>,
}

impl WeekGame {
    /// A plain untagged game between two known teams.
    pub fn new(team_a: TeamId, score_a: f64, team_b: TeamId, score_b: f64) -> Self {
        WeekGame {
            team_a: Some(team_a),
            team_b: Some(team_b),
            score_a,
            score_b,
            bracket: BracketTag::None,
            history_a: PlayoffHistory::default(),
            history_b: PlayoffHistory::default(),
            seed_a: None,
            seed_b: None,
        }
    }

    pub fn with_bracket(mut self, bracket: BracketTag) -> Self {
        self.bracket = bracket;
        self
    }

    pub fn with_history(mut self, a: PlayoffHistory, b: PlayoffHistory) -> Self {
        self.history_a = a;
        self.history_b = b;
        self
    }

    /// Resolve winner and loser. Fantasy scoring does not produce ties; an
    /// exact tie goes to `team_a`.
    fn decide(&self, index: usize, week: u32) -> Result<DecidedGame, IncompleteWeekError> {
        let incomplete = |reason: &str| IncompleteWeekError {
            index,
            week,
            reason: reason.to_string(),
        };
        let (Some(a), Some(b)) = (self.team_a, self.team_b) else {
            return Err(incomplete("game does not have two identifiable teams"));
        };
        if a == b {
            return Err(incomplete("a team cannot play itself"));
        }
        if !self.score_a.is_finite() || !self.score_b.is_finite() {
            return Err(incomplete("non-finite score"));
        }

        let a_wins = self.score_a >= self.score_b;
        let (winner, loser, winning_score, losing_score, winner_seed, loser_seed) = if a_wins {
            (a, b, self.score_a, self.score_b, self.seed_a, self.seed_b)
        } else {
            (b, a, self.score_b, self.score_a, self.seed_b, self.seed_a)
        };

        Ok(DecidedGame {
            matchup: MatchupKey::new(a, b),
            winner,
            loser,
            winning_score,
            losing_score,
            bracket: self.bracket,
            winner_seed,
            loser_seed,
        })
    }
}

/// A counted game with its winner resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecidedGame {
    pub matchup: MatchupKey,
    pub winner: TeamId,
    pub loser: TeamId,
    pub winning_score: f64,
    pub losing_score: f64,
    pub bracket: BracketTag,
    pub winner_seed: Option<u32>,
    pub loser_seed: Option<u32>,
}

impl DecidedGame {
    pub fn margin(&self) -> f64 {
        self.winning_score - self.losing_score
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The matchup with an extreme margin of victory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginResult {
    pub matchup: MatchupKey,
    pub winner: TeamId,
    pub margin: f64,
}

/// The team with an extreme individual score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub team: TeamId,
    pub score: f64,
}

/// Everything a prediction can be graded against for one week.
///
/// Derived from the week's games; never a source of truth on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week: u32,
    pub winners: BTreeSet<TeamId>,
    /// Every counted matchup, in input order.
    #[serde(default)]
    pub matchups: Vec<MatchupKey>,
    pub blowout: Option<MarginResult>,
    pub closest: Option<MarginResult>,
    pub highest: Option<ScoreResult>,
    pub lowest: Option<ScoreResult>,
}

impl WeekSummary {
    pub fn empty(week: u32) -> Self {
        WeekSummary {
            week,
            winners: BTreeSet::new(),
            matchups: Vec::new(),
            blowout: None,
            closest: None,
            highest: None,
            lowest: None,
        }
    }

    pub fn blowout_winner(&self) -> Option<TeamId> {
        self.blowout.map(|b| b.winner)
    }

    pub fn closest_winner(&self) -> Option<TeamId> {
        self.closest.map(|c| c.winner)
    }

    pub fn highest_scorer(&self) -> Option<TeamId> {
        self.highest.map(|h| h.team)
    }

    pub fn lowest_scorer(&self) -> Option<TeamId> {
        self.lowest.map(|l| l.team)
    }
}

/// Summary plus the bookkeeping of which games were used.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekResults {
    pub summary: WeekSummary,
    /// Games that counted, in input order.
    pub counted: Vec<DecidedGame>,
    /// Malformed games that were skipped.
    pub skipped: Vec<IncompleteWeekError>,
    /// Number of well-formed games left out by bracket rules.
    pub excluded: usize,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Summarize one week of games in a single pass.
///
/// Ladder games are filtered with [`admit`]. Exact ties on margin or score
/// keep the first game seen, in input order.
pub fn summarize(games: &[WeekGame], round: &RoundInfo) -> WeekResults {
    let week = round.week;
    let mut summary = WeekSummary::empty(week);
    let mut counted = Vec::new();
    let mut skipped = Vec::new();
    let mut excluded = 0;

    for (index, game) in games.iter().enumerate() {
        let decided = match game.decide(index, week) {
            Ok(d) => d,
            Err(e) => {
                warn!("{e}");
                skipped.push(e);
                continue;
            }
        };

        if let Err(reason) = admit(round, game.bracket, &game.history_a, &game.history_b) {
            debug!(
                "week {week}: ignoring {} ({:?}): {:?}",
                decided.matchup, game.bracket, reason
            );
            excluded += 1;
            continue;
        }

        let margin = decided.margin();
        summary.winners.insert(decided.winner);
        summary.matchups.push(decided.matchup);

        if summary.blowout.map_or(true, |b| margin > b.margin) {
            summary.blowout = Some(MarginResult {
                matchup: decided.matchup,
                winner: decided.winner,
                margin,
            });
        }
        if summary.closest.map_or(true, |c| margin < c.margin) {
            summary.closest = Some(MarginResult {
                matchup: decided.matchup,
                winner: decided.winner,
                margin,
            });
        }
        // The week's high score always belongs to a winner and the low
        // score to a loser.
        if summary
            .highest
            .map_or(true, |h| decided.winning_score > h.score)
        {
            summary.highest = Some(ScoreResult {
                team: decided.winner,
                score: decided.winning_score,
            });
        }
        if summary
            .lowest
            .map_or(true, |l| decided.losing_score < l.score)
        {
            summary.lowest = Some(ScoreResult {
                team: decided.loser,
                score: decided.losing_score,
            });
        }

        counted.push(decided);
    }

    WeekResults {
        summary,
        counted,
        skipped,
        excluded,
    }
}
