// Cumulative prediction standings with the optional drop-lowest-week rule.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::league::{MemberId, Ruleset};
use crate::scoring::ScoreBreakdown;

/// One member's standing after a graded week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub member: MemberId,
    pub week: u32,
    /// Season total with the dropped week (if any) excluded.
    pub cumulative_total: u32,
    /// The season-to-date minimum weekly total, held out of
    /// `cumulative_total`. Only set under the drop-lowest rule.
    pub dropped_low_week_value: Option<u32>,
    /// This week's own total, as accumulated.
    pub week_total: u32,
}

/// Fold one week's breakdown into a member's running standing.
///
/// Under drop-lowest, the first week is parked rather than counted. Each
/// later week either displaces the parked value (when it is lower, the old
/// parked value gets counted) or is counted itself. Exactly one week, the
/// lowest so far, is always excluded.
pub fn apply(
    prior: Option<&StandingsRow>,
    breakdown: &ScoreBreakdown,
    rules: Ruleset,
) -> StandingsRow {
    let total = breakdown.total();

    let (cumulative_total, dropped_low_week_value) = match (prior, rules.drop_lowest) {
        (None, false) => (total, None),
        (None, true) => (0, Some(total)),
        (Some(p), false) => (p.cumulative_total + total, None),
        (Some(p), true) => match p.dropped_low_week_value {
            Some(dropped) if total < dropped => (p.cumulative_total + dropped, Some(total)),
            Some(dropped) => (p.cumulative_total + total, Some(dropped)),
            // Prior row was accumulated without the rule; start dropping now.
            None => (p.cumulative_total, Some(total)),
        },
    };

    StandingsRow {
        member: breakdown.member,
        week: breakdown.week,
        cumulative_total,
        dropped_low_week_value,
        week_total: total,
    }
}

/// Compute every member's row for `week`.
///
/// `roster` is the league membership at grading time. Members without a
/// breakdown (no submission) accumulate zero; members without a prior row
/// start fresh. Every member in the roster, the prior rows, or the
/// breakdowns gets exactly one row, sorted by member id.
pub fn advance_week(
    week: u32,
    roster: &[MemberId],
    prior_rows: &[StandingsRow],
    breakdowns: &[ScoreBreakdown],
    rules: Ruleset,
) -> Vec<StandingsRow> {
    let prior: BTreeMap<MemberId, &StandingsRow> =
        prior_rows.iter().map(|r| (r.member, r)).collect();
    let scored: BTreeMap<MemberId, &ScoreBreakdown> =
        breakdowns.iter().map(|b| (b.member, b)).collect();

    let members: BTreeSet<MemberId> = roster
        .iter()
        .copied()
        .chain(prior.keys().copied())
        .chain(scored.keys().copied())
        .collect();

    members
        .into_iter()
        .map(|member| {
            let prior_row = prior.get(&member).copied();
            if week > 1 && prior_row.is_none() {
                warn!("{member} has no week {} standing; starting from zero", week - 1);
            }
            let breakdown = match scored.get(&member) {
                Some(b) => **b,
                None => {
                    debug!("{member} did not submit for week {week}; backfilling zero");
                    ScoreBreakdown::zero(member, week)
                }
            };
            apply(prior_row, &ScoreBreakdown { week, ..breakdown }, rules)
        })
        .collect()
}

/// Fold an ordered list of weekly totals in one go. Returns the cumulative
/// total and the held-out week, matching a week-by-week replay through
/// [`apply`].
pub fn fold_season(weekly_totals: &[u32], rules: Ruleset) -> (u32, Option<u32>) {
    if !rules.drop_lowest {
        return (weekly_totals.iter().sum(), None);
    }
    let Some(lowest) = weekly_totals.iter().copied().min() else {
        return (0, None);
    };
    let sum: u32 = weekly_totals.iter().sum();
    (sum - lowest, Some(lowest))
}
