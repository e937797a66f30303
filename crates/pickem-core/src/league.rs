// League identity and season shape: team/member ids, LeagueShape, rulesets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bracket::{classify, RoundInfo};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier for a fantasy team (one per league member's franchise).
///
/// Teams are never matched by display name; renames and duplicate names are
/// harmless because every join goes through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team#{}", self.0)
    }
}

/// Stable identifier for a prediction-game participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u32);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member#{}", self.0)
    }
}

/// An unordered pair of teams that met in a given week.
///
/// The smaller id is always stored first so `MatchupKey::new(a, b)` and
/// `MatchupKey::new(b, a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchupKey {
    low: TeamId,
    high: TeamId,
}

impl MatchupKey {
    pub fn new(a: TeamId, b: TeamId) -> Self {
        if a <= b {
            MatchupKey { low: a, high: b }
        } else {
            MatchupKey { low: b, high: a }
        }
    }

    pub fn teams(&self) -> (TeamId, TeamId) {
        (self.low, self.high)
    }

    pub fn contains(&self, team: TeamId) -> bool {
        self.low == team || self.high == team
    }
}

impl fmt::Display for MatchupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} versus {}", self.low, self.high)
    }
}

// ---------------------------------------------------------------------------
// League shape
// ---------------------------------------------------------------------------

/// Season-long structure of a league. All bracket round boundaries derive
/// from these three numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueShape {
    pub regular_season_weeks: u32,
    pub team_count: u32,
    pub playoff_team_count: u32,
}

impl LeagueShape {
    /// Build a validated shape.
    pub fn new(
        regular_season_weeks: u32,
        team_count: u32,
        playoff_team_count: u32,
    ) -> Result<Self, EngineError> {
        let shape = LeagueShape {
            regular_season_weeks,
            team_count,
            playoff_team_count,
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Check the shape is internally consistent.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.regular_season_weeks == 0 {
            return Err(EngineError::InvalidShape {
                message: "regular season must have at least one week".into(),
            });
        }
        if self.team_count < 2 {
            return Err(EngineError::InvalidShape {
                message: format!("a league needs at least 2 teams, got {}", self.team_count),
            });
        }
        if self.playoff_team_count > self.team_count {
            return Err(EngineError::InvalidShape {
                message: format!(
                    "{} playoff teams exceeds {} teams in the league",
                    self.playoff_team_count, self.team_count
                ),
            });
        }
        Ok(())
    }

    /// Number of rounds in the winners' bracket.
    pub fn winners_bracket_rounds(&self) -> u32 {
        if self.playoff_team_count > 4 {
            3
        } else {
            2
        }
    }

    /// Last week of the season that can carry a meaningful game.
    pub fn final_week(&self) -> u32 {
        self.regular_season_weeks + self.winners_bracket_rounds()
    }
}

// ---------------------------------------------------------------------------
// Rules and week context
// ---------------------------------------------------------------------------

/// Ruleset variant for standings accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ruleset {
    /// Exclude each member's single worst week from the running total.
    #[serde(default)]
    pub drop_lowest: bool,
}

/// Everything the engine needs to know about which week it is grading.
///
/// Passed explicitly into every computation instead of living in
/// process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekContext {
    pub season: i32,
    pub week: u32,
    pub shape: LeagueShape,
    pub rules: Ruleset,
}

impl WeekContext {
    pub fn new(season: i32, week: u32, shape: LeagueShape, rules: Ruleset) -> Self {
        WeekContext {
            season,
            week,
            shape,
            rules,
        }
    }

    /// Where this week falls in the season's bracket.
    pub fn round(&self) -> RoundInfo {
        classify(&self.shape, self.week)
    }
}
