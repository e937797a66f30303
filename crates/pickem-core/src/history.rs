// All-time league history over stored game records: head-to-head records,
// podium finishes, and last-place finishes.

use std::collections::BTreeMap;

use crate::league::TeamId;
use crate::record::GameRecord;

// ---------------------------------------------------------------------------
// Head to head
// ---------------------------------------------------------------------------

/// Win counts for the two sides of a rivalry, in the order they were asked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub first: u32,
    pub second: u32,
}

impl Tally {
    pub fn games(&self) -> u32 {
        self.first + self.second
    }
}

/// Which stage of the playoffs a meeting happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Quarterfinals,
    Semifinals,
    Championship,
    ThirdPlace,
    ConsolationFinal,
    Other,
}

impl Stage {
    pub fn of(record: &GameRecord) -> Self {
        if record.consolation {
            return if record.championship {
                Stage::ConsolationFinal
            } else {
                Stage::Other
            };
        }
        if record.quarterfinals {
            Stage::Quarterfinals
        } else if record.semifinals {
            Stage::Semifinals
        } else if record.finals && record.championship {
            Stage::Championship
        } else if record.finals && record.third_place {
            Stage::ThirdPlace
        } else {
            Stage::Other
        }
    }
}

/// A run of consecutive regular-season wins by one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub team: TeamId,
    pub games: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadToHead {
    pub first: TeamId,
    pub second: TeamId,
    pub regular_season: Tally,
    pub playoffs: Tally,
    pub consolation: Tally,
    /// Current regular-season streak, most recent game first.
    pub streak: Option<Streak>,
    /// Playoff and consolation meetings as (season, winner, stage).
    pub postseason_meetings: Vec<(i32, TeamId, Stage)>,
}

/// All-time record between `first` and `second`.
pub fn head_to_head(records: &[GameRecord], first: TeamId, second: TeamId) -> HeadToHead {
    let mut h2h = HeadToHead {
        first,
        second,
        regular_season: Tally::default(),
        playoffs: Tally::default(),
        consolation: Tally::default(),
        streak: None,
        postseason_meetings: Vec::new(),
    };

    let mut meetings: Vec<&GameRecord> = records
        .iter()
        .filter(|r| {
            (r.winner == first && r.loser == second) || (r.winner == second && r.loser == first)
        })
        .collect();
    meetings.sort_by_key(|r| std::cmp::Reverse((r.season, r.week)));

    for r in &meetings {
        let tally = if !r.playoffs {
            &mut h2h.regular_season
        } else if r.consolation {
            &mut h2h.consolation
        } else {
            &mut h2h.playoffs
        };
        if r.winner == first {
            tally.first += 1;
        } else {
            tally.second += 1;
        }
        if r.playoffs {
            h2h.postseason_meetings.push((r.season, r.winner, Stage::of(r)));
        }
    }

    let mut regular = meetings.iter().filter(|r| !r.playoffs);
    if let Some(latest) = regular.next() {
        let team = latest.winner;
        let games = 1 + regular.take_while(|r| r.winner == team).count() as u32;
        h2h.streak = Some(Streak { team, games });
    }

    h2h
}

// ---------------------------------------------------------------------------
// Podium and last place
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Podium {
    pub season: i32,
    pub champion: TeamId,
    pub runner_up: TeamId,
    pub third: Option<TeamId>,
}

/// Top-three finishes per season, newest season first. Seasons without a
/// recorded championship game are left out.
pub fn podium(records: &[GameRecord]) -> Vec<Podium> {
    let mut seasons: BTreeMap<i32, Podium> = BTreeMap::new();

    for r in records.iter().filter(|r| !r.consolation && r.championship) {
        seasons.insert(
            r.season,
            Podium {
                season: r.season,
                champion: r.winner,
                runner_up: r.loser,
                third: None,
            },
        );
    }
    for r in records.iter().filter(|r| !r.consolation && r.third_place) {
        if let Some(p) = seasons.get_mut(&r.season) {
            p.third = Some(r.winner);
        }
    }

    seasons.into_values().rev().collect()
}

/// The loser of each season's consolation final, newest season first.
pub fn last_place(records: &[GameRecord]) -> Vec<(i32, TeamId)> {
    let mut seasons: BTreeMap<i32, TeamId> = BTreeMap::new();
    for r in records.iter().filter(|r| r.consolation && r.championship) {
        seasons.insert(r.season, r.loser);
    }
    seasons.into_iter().rev().collect()
}
