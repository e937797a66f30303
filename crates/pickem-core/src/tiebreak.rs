// Waiver order and draft-selection standings, with their tiebreakers.
//
// Waivers go to the best prediction week first: most weekly points, then
// fewest real wins, then fewest real points, then a seeded coin flip.
// Draft selection goes to the strongest season, ties broken by the better
// final league standing.

use std::cmp::Ordering;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::bracket::{classify, Outcome};
use crate::league::{LeagueShape, MemberId};

// ---------------------------------------------------------------------------
// Playoff-adjusted team record
// ---------------------------------------------------------------------------

/// A team's real-league record as used for tiebreaking.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: u32,
    pub points_for: f64,
}

/// One completed playoff week for a team.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayoffWeek {
    pub outcome: Outcome,
    pub score: f64,
}

/// Fold playoff weeks into a regular-season record. League hosts stop
/// counting at the end of the regular season, so wins (byes included) and
/// points from each playoff round up to `week` are added here.
/// `playoff_weeks[0]` is round one.
pub fn adjusted_record(
    regular: TeamRecord,
    playoff_weeks: &[PlayoffWeek],
    shape: &LeagueShape,
    week: u32,
) -> TeamRecord {
    if !classify(shape, week).is_playoff {
        return regular;
    }
    let rounds_played = (week - shape.regular_season_weeks).min(3) as usize;

    playoff_weeks
        .iter()
        .take(rounds_played)
        .fold(regular, |acc, pw| TeamRecord {
            wins: acc.wins + u32::from(pw.outcome.counts_as_win()),
            points_for: acc.points_for + pw.score,
        })
}

// ---------------------------------------------------------------------------
// Waiver order
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaiverEntry {
    pub member: MemberId,
    /// Prediction points earned this week.
    pub week_points: u32,
    pub record: TeamRecord,
}

/// The deepest tiebreaker that had to be consulted for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DecidedBy {
    WeekPoints,
    Wins,
    PointsFor,
    CoinFlip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaiverSlot {
    pub entry: WaiverEntry,
    pub decided_by: DecidedBy,
}

/// Derive the coin-flip stream for a given week. The same seed, season and
/// week always yield the same flips.
fn coin_rng(seed: u64, season: i32, week: u32) -> ChaCha8Rng {
    let mixed = seed ^ ((season as u64) << 32) ^ u64::from(week);
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Waiver priority for `week`, first pick first. Returns `None` in the
/// finals week, when no waivers are processed.
pub fn waiver_order(
    entries: &[WaiverEntry],
    shape: &LeagueShape,
    seed: u64,
    season: i32,
    week: u32,
) -> Option<Vec<WaiverSlot>> {
    if classify(shape, week).is_finals {
        return None;
    }

    let mut sorted: Vec<WaiverEntry> = entries.to_vec();
    sorted.sort_by_key(|e| e.member);

    let mut rng = coin_rng(seed, season, week);
    let mut flipped: Vec<(WaiverEntry, u32)> =
        sorted.into_iter().map(|e| (e, rng.gen::<u32>())).collect();

    flipped.sort_by(|(a, fa), (b, fb)| {
        b.week_points
            .cmp(&a.week_points)
            .then(a.record.wins.cmp(&b.record.wins))
            .then(
                a.record
                    .points_for
                    .partial_cmp(&b.record.points_for)
                    .unwrap_or(Ordering::Equal),
            )
            .then(fa.cmp(fb))
    });

    let entries: Vec<WaiverEntry> = flipped.iter().map(|(e, _)| *e).collect();
    let slots = entries
        .iter()
        .map(|entry| WaiverSlot {
            entry: *entry,
            decided_by: waiver_decider(entry, &entries),
        })
        .collect();
    Some(slots)
}

fn waiver_decider(entry: &WaiverEntry, all: &[WaiverEntry]) -> DecidedBy {
    let tied = |f: &dyn Fn(&WaiverEntry) -> bool| all.iter().filter(|e| f(e)).count() > 1;

    let same_points = |e: &WaiverEntry| e.week_points == entry.week_points;
    let same_wins = |e: &WaiverEntry| same_points(e) && e.record.wins == entry.record.wins;
    let same_pf = |e: &WaiverEntry| same_wins(e) && e.record.points_for == entry.record.points_for;

    if tied(&same_pf) {
        DecidedBy::CoinFlip
    } else if tied(&same_wins) {
        DecidedBy::PointsFor
    } else if tied(&same_points) {
        DecidedBy::Wins
    } else {
        DecidedBy::WeekPoints
    }
}

// ---------------------------------------------------------------------------
// Draft selection standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftEntry {
    pub member: MemberId,
    pub season_total: u32,
    /// Final league standing (1 is the champion), once known.
    pub final_standing: Option<u32>,
}

/// Draft-selection order: highest season total first, ties to the better
/// final standing. Members without a final standing sort after those with
/// one, then by member id.
pub fn draft_order(entries: &[DraftEntry]) -> Vec<DraftEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| {
        b.season_total
            .cmp(&a.season_total)
            .then_with(|| match (a.final_standing, b.final_standing) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then(a.member.cmp(&b.member))
    });
    sorted
}
