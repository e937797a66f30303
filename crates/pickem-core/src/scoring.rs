// Prediction scoring: per-member breakdowns plus the week-level
// closest-to-pin bonus for exact high/low score guesses.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::league::{MatchupKey, MemberId, TeamId};
use crate::results::WeekSummary;

// ---------------------------------------------------------------------------
// Prediction form
// ---------------------------------------------------------------------------

/// One member's picks for one week. Resubmissions overwrite the stored
/// form, so there is at most one per member per week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionForm {
    pub member: MemberId,
    pub week: u32,
    /// One team picked from each matchup the member filled in.
    #[serde(default)]
    pub picked_winners: BTreeSet<TeamId>,
    #[serde(default)]
    pub blowout_guess: Option<MatchupKey>,
    #[serde(default)]
    pub closest_guess: Option<MatchupKey>,
    #[serde(default)]
    pub highest_guess: Option<TeamId>,
    #[serde(default)]
    pub lowest_guess: Option<TeamId>,
    /// Free-text exact score guesses, kept as typed. Anything that does not
    /// parse as a number is treated as no guess.
    #[serde(default)]
    pub exact_high_guess: Option<String>,
    #[serde(default)]
    pub exact_low_guess: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl PredictionForm {
    /// An empty form, as created when a member first touches the week.
    pub fn blank(member: MemberId, week: u32, submitted_at: DateTime<Utc>) -> Self {
        PredictionForm {
            member,
            week,
            picked_winners: BTreeSet::new(),
            blowout_guess: None,
            closest_guess: None,
            highest_guess: None,
            lowest_guess: None,
            exact_high_guess: None,
            exact_low_guess: None,
            submitted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Score breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub member: MemberId,
    pub week: u32,
    pub matchup_points: u32,
    pub blowout_bonus: u32,
    pub closest_bonus: u32,
    pub highest_bonus: u32,
    pub lowest_bonus: u32,
}

impl ScoreBreakdown {
    /// The breakdown used for members who did not submit.
    pub fn zero(member: MemberId, week: u32) -> Self {
        ScoreBreakdown {
            member,
            week,
            matchup_points: 0,
            blowout_bonus: 0,
            closest_bonus: 0,
            highest_bonus: 0,
            lowest_bonus: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.matchup_points
            + self.blowout_bonus
            + self.closest_bonus
            + self.highest_bonus
            + self.lowest_bonus
    }
}

// ---------------------------------------------------------------------------
// Exact score handling
// ---------------------------------------------------------------------------

/// A score rounded to one decimal place, held as an integer count of tenths
/// so comparisons are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tenths(pub i64);

/// One full point, in tenths.
const ONE_POINT: i64 = 10;

/// Largest magnitude accepted as a score. No fantasy team gets near it.
const MAX_SCORE: f64 = 1_000_000.0;

impl Tenths {
    /// `None` for non-finite scores and anything beyond [`MAX_SCORE`].
    pub fn from_score(score: f64) -> Option<Self> {
        if !score.is_finite() || score.abs() > MAX_SCORE {
            return None;
        }
        Some(Tenths((score * 10.0).round() as i64))
    }

    pub fn distance(self, other: Tenths) -> Tenths {
        Tenths(self.0.saturating_sub(other.0).saturating_abs())
    }

    pub fn as_points(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

/// Parse a typed score guess like `"142.3"`. Returns `None` for blanks and
/// anything non-numeric.
pub fn parse_score_guess(raw: &str) -> Option<Tenths> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().and_then(Tenths::from_score)
}

// ---------------------------------------------------------------------------
// Per-member scoring
// ---------------------------------------------------------------------------

/// Score one form against the week's summary.
///
/// Exact-score bonuses depend on every member's guess, so they are not
/// applied here; see [`score_week`].
pub fn score(form: &PredictionForm, summary: &WeekSummary) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::zero(form.member, form.week);
    let picks = effective_picks(form, summary);

    breakdown.matchup_points = picks.intersection(&summary.winners).count() as u32;

    // Blowout needs both the matchup and its winner.
    if let (Some(guess), Some(blowout)) = (form.blowout_guess, summary.blowout) {
        if guess == blowout.matchup && picks.contains(&blowout.winner) {
            breakdown.blowout_bonus = 1;
        }
    }

    if let (Some(guess), Some(closest)) = (form.closest_guess, summary.closest) {
        if guess == closest.matchup {
            breakdown.closest_bonus = 1;
        }
    }

    if form.highest_guess.is_some() && form.highest_guess == summary.highest_scorer() {
        breakdown.highest_bonus = 1;
    }
    if form.lowest_guess.is_some() && form.lowest_guess == summary.lowest_scorer() {
        breakdown.lowest_bonus = 1;
    }

    breakdown
}

/// The form's picks with contradictory ones removed. A matchup where both
/// sides were picked counts as unpicked.
fn effective_picks(form: &PredictionForm, summary: &WeekSummary) -> BTreeSet<TeamId> {
    let mut picks = form.picked_winners.clone();
    for matchup in &summary.matchups {
        let (a, b) = matchup.teams();
        if picks.contains(&a) && picks.contains(&b) {
            warn!("{}: picked both sides of {matchup}; neither counts", form.member);
            picks.remove(&a);
            picks.remove(&b);
        }
    }
    picks
}

// ---------------------------------------------------------------------------
// Week-level scoring
// ---------------------------------------------------------------------------

/// Who earned the exact-score bonuses for one of the two extremes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinAward {
    /// Every member tied for the smallest distance to the real score.
    pub closest: Vec<MemberId>,
    pub closest_distance: Option<Tenths>,
    /// Members whose guess landed within one point of the real score.
    pub within_one_point: Vec<MemberId>,
}

/// Breakdowns for every submitted form in a week, with pin bonuses applied.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekScores {
    pub breakdowns: Vec<ScoreBreakdown>,
    pub high_pin: PinAward,
    pub low_pin: PinAward,
}

impl WeekScores {
    pub fn get(&self, member: MemberId) -> Option<&ScoreBreakdown> {
        self.breakdowns.iter().find(|b| b.member == member)
    }
}

/// Score every form for the week.
///
/// Members who named the right highest (lowest) scorer and typed a valid
/// exact score compete for the pin: everyone at the minimum distance gets one
/// extra point, and everyone within one point gets another. Both the guess
/// and the real score are rounded to a tenth first.
///
/// If the same member appears twice, the later submission wins.
pub fn score_week(forms: &[PredictionForm], summary: &WeekSummary) -> WeekScores {
    let mut latest: BTreeMap<MemberId, &PredictionForm> = BTreeMap::new();
    for form in forms {
        if form.week != summary.week {
            warn!(
                "{} submitted a week {} form while grading week {}; ignoring it",
                form.member, form.week, summary.week
            );
            continue;
        }
        let existing = latest.get(&form.member).map(|f| f.submitted_at);
        if let Some(existing_at) = existing {
            warn!("duplicate form for {}; keeping the later one", form.member);
            if existing_at > form.submitted_at {
                continue;
            }
        }
        latest.insert(form.member, form);
    }

    let mut breakdowns: BTreeMap<MemberId, ScoreBreakdown> = latest
        .values()
        .map(|form| (form.member, score(form, summary)))
        .collect();

    let actual_high = summary.highest.and_then(|h| Tenths::from_score(h.score));
    let high_candidates: Vec<(MemberId, Tenths)> = latest
        .values()
        .filter(|form| breakdowns.get(&form.member).is_some_and(|b| b.highest_bonus > 0))
        .filter_map(|form| exact_guess(form.member, form.exact_high_guess.as_deref()))
        .collect();
    let high_pin = actual_high
        .map(|actual| award_pin(&high_candidates, actual))
        .unwrap_or_default();

    let actual_low = summary.lowest.and_then(|l| Tenths::from_score(l.score));
    let low_candidates: Vec<(MemberId, Tenths)> = latest
        .values()
        .filter(|form| breakdowns.get(&form.member).is_some_and(|b| b.lowest_bonus > 0))
        .filter_map(|form| exact_guess(form.member, form.exact_low_guess.as_deref()))
        .collect();
    let low_pin = actual_low
        .map(|actual| award_pin(&low_candidates, actual))
        .unwrap_or_default();

    for member in high_pin.closest.iter().chain(&high_pin.within_one_point) {
        if let Some(b) = breakdowns.get_mut(member) {
            b.highest_bonus += 1;
        }
    }
    for member in low_pin.closest.iter().chain(&low_pin.within_one_point) {
        if let Some(b) = breakdowns.get_mut(member) {
            b.lowest_bonus += 1;
        }
    }

    WeekScores {
        breakdowns: breakdowns.into_values().collect(),
        high_pin,
        low_pin,
    }
}

fn exact_guess(member: MemberId, raw: Option<&str>) -> Option<(MemberId, Tenths)> {
    let raw = raw?;
    match parse_score_guess(raw) {
        Some(tenths) => Some((member, tenths)),
        None => {
            if !raw.trim().is_empty() {
                warn!("{member}: ignoring malformed exact score guess {raw:?}");
            }
            None
        }
    }
}

fn award_pin(candidates: &[(MemberId, Tenths)], actual: Tenths) -> PinAward {
    let Some(best) = candidates.iter().map(|(_, g)| g.distance(actual)).min() else {
        return PinAward::default();
    };

    let closest: Vec<MemberId> = candidates
        .iter()
        .filter(|(_, g)| g.distance(actual) == best)
        .map(|(m, _)| *m)
        .collect();
    let within_one_point: Vec<MemberId> = candidates
        .iter()
        .filter(|(_, g)| g.distance(actual).0 <= ONE_POINT)
        .map(|(m, _)| *m)
        .collect();

    debug!(
        "pin at {:.1}: closest {:?} (off by {:.1}), within a point {:?}",
        actual.as_points(),
        closest,
        best.as_points(),
        within_one_point
    );

    PinAward {
        closest,
        closest_distance: Some(best),
        within_one_point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{MarginResult, ScoreResult};
    use chrono::TimeZone;

    fn t(id: u32) -> TeamId {
        TeamId(id)
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 12, 19, minute, 0).unwrap()
    }

    /// Week 4: 1 beats 2 by 40 (blowout), 3 beats 4 by 2 (closest),
    /// 1 scores 141.9 (high), 4 scores 88.0 (low).
    fn summary() -> WeekSummary {
        WeekSummary {
            week: 4,
            winners: BTreeSet::from([t(1), t(3)]),
            matchups: vec![MatchupKey::new(t(1), t(2)), MatchupKey::new(t(3), t(4))],
            blowout: Some(MarginResult {
                matchup: MatchupKey::new(t(1), t(2)),
                winner: t(1),
                margin: 40.0,
            }),
            closest: Some(MarginResult {
                matchup: MatchupKey::new(t(3), t(4)),
                winner: t(3),
                margin: 2.0,
            }),
            highest: Some(ScoreResult {
                team: t(1),
                score: 141.9,
            }),
            lowest: Some(ScoreResult {
                team: t(4),
                score: 88.0,
            }),
        }
    }

    fn form(member: u32) -> PredictionForm {
        PredictionForm::blank(MemberId(member), 4, at(0))
    }

    fn perfect_form(member: u32) -> PredictionForm {
        PredictionForm {
            picked_winners: BTreeSet::from([t(1), t(3)]),
            blowout_guess: Some(MatchupKey::new(t(2), t(1))),
            closest_guess: Some(MatchupKey::new(t(3), t(4))),
            highest_guess: Some(t(1)),
            lowest_guess: Some(t(4)),
            ..form(member)
        }
    }

    // ------------------------------------------------------------------
    // score
    // ------------------------------------------------------------------

    #[test]
    fn perfect_form_gets_every_base_point() {
        let b = score(&perfect_form(1), &summary());
        assert_eq!(b.matchup_points, 2);
        assert_eq!(b.blowout_bonus, 1);
        assert_eq!(b.closest_bonus, 1);
        assert_eq!(b.highest_bonus, 1);
        assert_eq!(b.lowest_bonus, 1);
        assert_eq!(b.total(), 6);
    }

    #[test]
    fn blowout_requires_picking_its_winner() {
        let f = PredictionForm {
            picked_winners: BTreeSet::from([t(2), t(3)]),
            blowout_guess: Some(MatchupKey::new(t(1), t(2))),
            ..form(2)
        };
        let b = score(&f, &summary());
        assert_eq!(b.blowout_bonus, 0);
        assert_eq!(b.matchup_points, 1);
    }

    #[test]
    fn closest_has_no_winner_coupling() {
        let f = PredictionForm {
            picked_winners: BTreeSet::from([t(4)]),
            closest_guess: Some(MatchupKey::new(t(4), t(3))),
            ..form(3)
        };
        let b = score(&f, &summary());
        assert_eq!(b.closest_bonus, 1);
        assert_eq!(b.matchup_points, 0);
    }

    #[test]
    fn picking_both_sides_of_a_matchup_counts_for_neither() {
        let f = PredictionForm {
            picked_winners: BTreeSet::from([t(1), t(2), t(3), t(4)]),
            blowout_guess: Some(MatchupKey::new(t(1), t(2))),
            ..form(6)
        };
        let b = score(&f, &summary());
        assert_eq!(b.matchup_points, 0);
        assert_eq!(b.blowout_bonus, 0);

        let hedged_once = PredictionForm {
            picked_winners: BTreeSet::from([t(1), t(2), t(3)]),
            ..form(6)
        };
        assert_eq!(score(&hedged_once, &summary()).matchup_points, 1);
    }

    #[test]
    fn blank_form_scores_zero() {
        assert_eq!(score(&form(5), &summary()), ScoreBreakdown::zero(MemberId(5), 4));
    }

    #[test]
    fn perfect_form_against_empty_week_scores_zero() {
        let b = score(&perfect_form(5), &WeekSummary::empty(4));
        assert_eq!(b.total(), 0);
    }

    #[test]
    fn score_is_idempotent() {
        let f = perfect_form(1);
        let s = summary();
        assert_eq!(score(&f, &s), score(&f, &s));
    }

    // ------------------------------------------------------------------
    // Pin bonuses
    // ------------------------------------------------------------------

    #[test]
    fn tied_pin_guesses_share_the_point() {
        let a = PredictionForm {
            exact_high_guess: Some("142.3".into()),
            ..perfect_form(1)
        };
        let b = PredictionForm {
            exact_high_guess: Some("142.3".into()),
            submitted_at: at(30),
            ..perfect_form(2)
        };
        let week = score_week(&[a, b], &summary());

        assert_eq!(week.high_pin.closest, vec![MemberId(1), MemberId(2)]);
        assert_eq!(week.high_pin.closest_distance, Some(Tenths(4)));
        assert_eq!(week.high_pin.within_one_point, vec![MemberId(1), MemberId(2)]);
        // Base point + closest + within one point.
        assert_eq!(week.get(MemberId(1)).unwrap().highest_bonus, 3);
        assert_eq!(week.get(MemberId(2)).unwrap().highest_bonus, 3);
    }

    #[test]
    fn only_the_closest_guess_wins_the_pin() {
        let near = PredictionForm {
            exact_high_guess: Some("141.5".into()),
            ..perfect_form(1)
        };
        let far = PredictionForm {
            exact_high_guess: Some("150".into()),
            ..perfect_form(2)
        };
        let week = score_week(&[near, far], &summary());
        assert_eq!(week.high_pin.closest, vec![MemberId(1)]);
        assert_eq!(week.get(MemberId(1)).unwrap().highest_bonus, 3);
        assert_eq!(week.get(MemberId(2)).unwrap().highest_bonus, 1);
    }

    #[test]
    fn pin_requires_the_right_scorer() {
        let wrong_team = PredictionForm {
            highest_guess: Some(t(3)),
            exact_high_guess: Some("141.9".into()),
            ..form(1)
        };
        let right_team = PredictionForm {
            highest_guess: Some(t(1)),
            exact_high_guess: Some("120".into()),
            ..form(2)
        };
        let week = score_week(&[wrong_team, right_team], &summary());
        assert_eq!(week.get(MemberId(1)).unwrap().highest_bonus, 0);
        // Sole candidate is closest by default but not within a point.
        assert_eq!(week.high_pin.closest, vec![MemberId(2)]);
        assert!(week.high_pin.within_one_point.is_empty());
        assert_eq!(week.get(MemberId(2)).unwrap().highest_bonus, 2);
    }

    #[test]
    fn malformed_guess_forfeits_only_the_pin() {
        let f = PredictionForm {
            exact_low_guess: Some("eighty-eight".into()),
            ..perfect_form(1)
        };
        let week = score_week(&[f], &summary());
        let b = week.get(MemberId(1)).unwrap();
        assert_eq!(b.lowest_bonus, 1);
        assert_eq!(b.total(), 6);
        assert!(week.low_pin.closest.is_empty());
    }

    #[test]
    fn within_one_point_is_inclusive_after_rounding() {
        let f = PredictionForm {
            exact_low_guess: Some("89.04".into()),
            ..perfect_form(1)
        };
        let week = score_week(&[f], &summary());
        assert_eq!(week.low_pin.closest_distance, Some(Tenths(10)));
        assert_eq!(week.low_pin.within_one_point, vec![MemberId(1)]);
    }

    #[test]
    fn later_duplicate_form_wins() {
        let early = PredictionForm {
            submitted_at: at(0),
            ..perfect_form(1)
        };
        let late = PredictionForm {
            submitted_at: at(10),
            ..form(1)
        };
        let week = score_week(&[late, early], &summary());
        assert_eq!(week.breakdowns.len(), 1);
        assert_eq!(week.breakdowns[0].total(), 0);
    }

    #[test]
    fn bonus_fields_stay_bounded() {
        let forms: Vec<PredictionForm> = (1..=6)
            .map(|m| PredictionForm {
                exact_high_guess: Some("141.9".into()),
                exact_low_guess: Some("88".into()),
                ..perfect_form(m)
            })
            .collect();
        let week = score_week(&forms, &summary());
        for b in &week.breakdowns {
            assert!(b.blowout_bonus <= 1);
            assert!(b.closest_bonus <= 1);
            assert!(b.highest_bonus <= 3);
            assert!(b.lowest_bonus <= 3);
            assert!(b.matchup_points as usize <= summary().winners.len());
            assert_eq!(b.total(), 10);
        }
    }

    #[test]
    fn parse_score_guess_handles_junk() {
        assert_eq!(parse_score_guess(" 101.25 "), Some(Tenths(1013)));
        assert_eq!(parse_score_guess(""), None);
        assert_eq!(parse_score_guess("abc"), None);
        assert_eq!(parse_score_guess("NaN"), None);
        assert_eq!(parse_score_guess("1e300"), None);
        assert_eq!(parse_score_guess("-1e300"), None);
    }

    #[test]
    fn huge_exact_guesses_are_ignored() {
        let low = PredictionForm {
            exact_high_guess: Some("-1e300".into()),
            ..perfect_form(1)
        };
        let high = PredictionForm {
            exact_high_guess: Some("1e300".into()),
            ..perfect_form(2)
        };
        let week = score_week(&[low, high], &summary());
        assert!(week.high_pin.closest.is_empty());
        for b in &week.breakdowns {
            assert_eq!(b.highest_bonus, 1);
            assert_eq!(b.total(), 6);
        }
    }

    #[test]
    fn distance_saturates_instead_of_overflowing() {
        assert_eq!(Tenths(i64::MIN).distance(Tenths(i64::MAX)), Tenths(i64::MAX));
        assert_eq!(Tenths(1425).distance(Tenths(1419)), Tenths(6));
    }
}
