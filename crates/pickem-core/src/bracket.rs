// Playoff bracket classification.
//
// Everything here is derived from (LeagueShape, week) alone. Nothing is
// stored, so a re-run over an old season reproduces the same rounds.

use serde::{Deserialize, Serialize};

use crate::league::LeagueShape;

// ---------------------------------------------------------------------------
// Game tags and per-team playoff history
// ---------------------------------------------------------------------------

/// Which ladder the results provider placed a game on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketTag {
    /// Regular season game, or a main winners'-bracket playoff game.
    #[default]
    None,
    /// Placement game between winners'-bracket losers. Only the round-three
    /// third-place game counts.
    WinnersLadder,
    /// Consolation ("last place") ladder game.
    ConsolationLadder,
}

/// Result of one week for one team, as reported by the league provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Tie,
    /// The team had no game that week. Providers report playoff byes as
    /// undecided; for record keeping a bye counts as a win.
    Bye,
}

impl Outcome {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "W" => Some(Outcome::Win),
            "L" => Some(Outcome::Loss),
            "T" => Some(Outcome::Tie),
            "U" | "B" | "BYE" => Some(Outcome::Bye),
            _ => None,
        }
    }

    pub fn counts_as_win(&self) -> bool {
        matches!(self, Outcome::Win | Outcome::Bye)
    }
}

/// A team's outcomes in the first two playoff rounds, when known.
///
/// Callers supply this so ladder games can be disambiguated without a stored
/// "already eliminated" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayoffHistory {
    #[serde(default)]
    pub round_one: Option<Outcome>,
    #[serde(default)]
    pub round_two: Option<Outcome>,
}

impl PlayoffHistory {
    pub fn won_round_one(&self) -> bool {
        self.round_one == Some(Outcome::Win)
    }

    pub fn won_round_two(&self) -> bool {
        self.round_two == Some(Outcome::Win)
    }
}

// ---------------------------------------------------------------------------
// Round classification
// ---------------------------------------------------------------------------

/// Which playoff round, if any, a week represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundInfo {
    pub week: u32,
    pub is_playoff: bool,
    pub is_round_one: bool,
    pub is_round_two: bool,
    pub is_round_three: bool,
    pub is_quarterfinals: bool,
    pub is_semifinals: bool,
    pub is_finals: bool,
    pub is_consolation_finals: bool,
    /// The consolation ladder already crowned its last-place team, so any
    /// further consolation games must be ignored.
    pub is_consolation_ladder_closed: bool,
}

/// Classify `week` against the league's bracket structure.
///
/// Leagues with more than four playoff teams run a three-round winners'
/// bracket (quarterfinals, semifinals, finals); smaller playoffs run two
/// (semifinals, finals). Leagues under twelve teams with a three-round
/// bracket finish their consolation ladder a round early.
pub fn classify(shape: &LeagueShape, week: u32) -> RoundInfo {
    let reg = shape.regular_season_weeks;
    let big_bracket = shape.playoff_team_count > 4;

    let is_playoff = week > reg;
    let is_round_one = week == reg + 1;
    let is_round_two = week == reg + 2;
    // Two-round brackets in 12+ team leagues have no third round at all.
    let round_three_exists = big_bracket || shape.team_count < 12;
    let is_round_three = round_three_exists && week == reg + 3;

    let is_quarterfinals = big_bracket && is_round_one;
    let is_semifinals = if big_bracket { is_round_two } else { is_round_one };
    let is_finals = if big_bracket { is_round_three } else { is_round_two };

    let short_consolation = shape.team_count < 12 && big_bracket;
    let is_consolation_finals = if short_consolation {
        is_semifinals
    } else {
        is_finals
    };
    let is_consolation_ladder_closed = is_round_three && !is_consolation_finals;

    RoundInfo {
        week,
        is_playoff,
        is_round_one,
        is_round_two,
        is_round_three,
        is_quarterfinals,
        is_semifinals,
        is_finals,
        is_consolation_finals,
        is_consolation_ladder_closed,
    }
}

// ---------------------------------------------------------------------------
// Game admission
// ---------------------------------------------------------------------------

/// Why a tagged game was left out of a week's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The consolation ladder already finished.
    ConsolationClosed,
    /// A contestant already won a consolation game and is out of the
    /// last-place race.
    ConsolationSurvivor,
    /// A winners'-ladder placement game other than the third-place game.
    NotThirdPlaceGame,
}

/// Decide whether a game with `tag` counts toward `round`'s results.
///
/// `a` and `b` are the two contestants' prior playoff outcomes. The
/// third-place check relies on them: a round-three winners'-ladder game is
/// the real third-place game only when neither team won in round two.
pub fn admit(
    round: &RoundInfo,
    tag: BracketTag,
    a: &PlayoffHistory,
    b: &PlayoffHistory,
) -> Result<(), Exclusion> {
    match tag {
        BracketTag::None => Ok(()),
        BracketTag::WinnersLadder => {
            if round.is_round_three && !a.won_round_two() && !b.won_round_two() {
                Ok(())
            } else {
                Err(Exclusion::NotThirdPlaceGame)
            }
        }
        BracketTag::ConsolationLadder => {
            if !round.is_playoff {
                return Ok(());
            }
            if round.is_consolation_ladder_closed {
                return Err(Exclusion::ConsolationClosed);
            }
            if round.is_round_three && (a.won_round_two() || b.won_round_two()) {
                return Err(Exclusion::ConsolationSurvivor);
            }
            if !round.is_round_one && (a.won_round_one() || b.won_round_one()) {
                return Err(Exclusion::ConsolationSurvivor);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(weeks: u32, teams: u32, playoff: u32) -> LeagueShape {
        LeagueShape::new(weeks, teams, playoff).unwrap()
    }

    fn history(round_one: Option<Outcome>, round_two: Option<Outcome>) -> PlayoffHistory {
        PlayoffHistory {
            round_one,
            round_two,
        }
    }

    // ------------------------------------------------------------------
    // classify
    // ------------------------------------------------------------------

    #[test]
    fn regular_season_week_has_no_round_flags() {
        let info = classify(&shape(13, 10, 6), 9);
        assert_eq!(
            info,
            RoundInfo {
                week: 9,
                ..RoundInfo::default()
            }
        );
    }

    #[test]
    fn four_team_playoff_round_one_is_semifinals() {
        let info = classify(&shape(13, 10, 4), 14);
        assert!(info.is_playoff);
        assert!(info.is_round_one);
        assert!(info.is_semifinals);
        assert!(!info.is_quarterfinals);
        assert!(!info.is_finals);
    }

    #[test]
    fn four_team_playoff_round_two_is_finals_and_consolation_finals() {
        let info = classify(&shape(13, 10, 4), 15);
        assert!(info.is_finals);
        assert!(info.is_consolation_finals);
        assert!(!info.is_consolation_ladder_closed);
    }

    #[test]
    fn eight_team_playoff_runs_three_rounds() {
        let s = shape(13, 14, 8);
        let r1 = classify(&s, 14);
        let r2 = classify(&s, 15);
        let r3 = classify(&s, 16);
        assert!(r1.is_quarterfinals && !r1.is_semifinals);
        assert!(r2.is_semifinals && !r2.is_finals);
        assert!(r3.is_finals && r3.is_round_three);
        // 14 teams: consolation ladder runs the full length.
        assert!(r3.is_consolation_finals);
        assert!(!r3.is_consolation_ladder_closed);
    }

    #[test]
    fn small_league_with_big_bracket_closes_consolation_early() {
        let s = shape(13, 10, 6);
        let r2 = classify(&s, 15);
        assert!(r2.is_semifinals);
        assert!(r2.is_consolation_finals);
        assert!(!r2.is_consolation_ladder_closed);

        let r3 = classify(&s, 16);
        assert!(r3.is_finals);
        assert!(!r3.is_consolation_finals);
        assert!(r3.is_consolation_ladder_closed);
    }

    #[test]
    fn large_league_small_bracket_has_no_round_three() {
        let info = classify(&shape(13, 12, 4), 16);
        assert!(info.is_playoff);
        assert!(!info.is_round_one);
        assert!(!info.is_round_two);
        assert!(!info.is_round_three);
        assert!(!info.is_quarterfinals);
        assert!(!info.is_semifinals);
        assert!(!info.is_finals);
        assert!(!info.is_consolation_finals);
        assert!(!info.is_consolation_ladder_closed);
    }

    #[test]
    fn small_league_small_bracket_round_three_is_consolation_overflow() {
        let info = classify(&shape(13, 10, 4), 16);
        assert!(info.is_round_three);
        assert!(!info.is_finals);
        assert!(info.is_consolation_ladder_closed);
    }

    #[test]
    fn classify_is_deterministic_over_every_week() {
        for (weeks, teams, playoff) in [(13, 10, 4), (13, 10, 6), (14, 12, 4), (13, 14, 8)] {
            let s = shape(weeks, teams, playoff);
            for week in 1..=weeks + 5 {
                assert_eq!(classify(&s, week), classify(&s, week));
            }
        }
    }

    // ------------------------------------------------------------------
    // admit
    // ------------------------------------------------------------------

    #[test]
    fn untagged_games_always_count() {
        let round = classify(&shape(13, 10, 6), 16);
        let none = PlayoffHistory::default();
        assert_eq!(admit(&round, BracketTag::None, &none, &none), Ok(()));
    }

    #[test]
    fn third_place_game_counts_only_in_round_three_between_round_two_losers() {
        let s = shape(13, 14, 8);
        let lost = history(Some(Outcome::Win), Some(Outcome::Loss));
        let won = history(Some(Outcome::Win), Some(Outcome::Win));

        let r3 = classify(&s, 16);
        assert_eq!(admit(&r3, BracketTag::WinnersLadder, &lost, &lost), Ok(()));
        assert_eq!(
            admit(&r3, BracketTag::WinnersLadder, &lost, &won),
            Err(Exclusion::NotThirdPlaceGame)
        );

        let r2 = classify(&s, 15);
        assert_eq!(
            admit(&r2, BracketTag::WinnersLadder, &lost, &lost),
            Err(Exclusion::NotThirdPlaceGame)
        );
    }

    #[test]
    fn consolation_games_ignored_after_ladder_closes() {
        let r3 = classify(&shape(13, 10, 6), 16);
        let none = PlayoffHistory::default();
        assert_eq!(
            admit(&r3, BracketTag::ConsolationLadder, &none, &none),
            Err(Exclusion::ConsolationClosed)
        );
    }

    #[test]
    fn consolation_survivors_are_excluded() {
        let s = shape(13, 14, 8);
        let r2 = classify(&s, 15);
        let survived = history(Some(Outcome::Win), None);
        let lost = history(Some(Outcome::Loss), None);
        assert_eq!(
            admit(&r2, BracketTag::ConsolationLadder, &survived, &lost),
            Err(Exclusion::ConsolationSurvivor)
        );
        assert_eq!(admit(&r2, BracketTag::ConsolationLadder, &lost, &lost), Ok(()));

        let r1 = classify(&s, 14);
        assert_eq!(
            admit(&r1, BracketTag::ConsolationLadder, &survived, &lost),
            Ok(())
        );
    }

    #[test]
    fn round_two_consolation_winners_sit_out_round_three() {
        let s = shape(13, 14, 8);
        let r3 = classify(&s, 16);
        assert!(r3.is_round_three && !r3.is_consolation_ladder_closed);

        let won_round_two = history(Some(Outcome::Loss), Some(Outcome::Win));
        let lost_both = history(Some(Outcome::Loss), Some(Outcome::Loss));
        assert_eq!(
            admit(&r3, BracketTag::ConsolationLadder, &lost_both, &won_round_two),
            Err(Exclusion::ConsolationSurvivor)
        );
        assert_eq!(
            admit(&r3, BracketTag::ConsolationLadder, &lost_both, &lost_both),
            Ok(())
        );
    }

    #[test]
    fn outcome_codes_parse() {
        assert_eq!(Outcome::from_code("w"), Some(Outcome::Win));
        assert_eq!(Outcome::from_code("U"), Some(Outcome::Bye));
        assert_eq!(Outcome::from_code("?"), None);
        assert!(Outcome::Bye.counts_as_win());
        assert!(!Outcome::Tie.counts_as_win());
    }
}
