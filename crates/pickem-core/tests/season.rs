// End-to-end season replay through the public engine API: classify each
// week, summarize the games, score the forms, accumulate standings, and
// read league history back out of the labelled records.

use chrono::{TimeZone, Utc};

use pickem_core::bracket::{classify, BracketTag};
use pickem_core::history::{last_place, podium};
use pickem_core::record::{label_week, GameRecord};
use pickem_core::results::{summarize, WeekGame};
use pickem_core::scoring::{score_week, PredictionForm};
use pickem_core::standings::{advance_week, fold_season, StandingsRow};
use pickem_core::{LeagueShape, MatchupKey, MemberId, Ruleset, TeamId};

// ===========================================================================
// Fixtures
// ===========================================================================

const ALICE: MemberId = MemberId(1);
const BOB: MemberId = MemberId(2);
const CARA: MemberId = MemberId(3);

fn t(id: u32) -> TeamId {
    TeamId(id)
}

fn shape() -> LeagueShape {
    // Two-round bracket: semifinals in week 4, finals in week 5.
    LeagueShape::new(3, 4, 2).unwrap()
}

fn games_for(week: u32) -> Vec<WeekGame> {
    match week {
        1 => vec![
            WeekGame::new(t(1), 120.4, t(2), 98.1),
            WeekGame::new(t(3), 101.0, t(4), 99.5),
        ],
        2 => vec![
            WeekGame::new(t(1), 88.0, t(3), 131.2),
            WeekGame::new(t(2), 110.0, t(4), 70.3),
        ],
        3 => vec![
            WeekGame::new(t(1), 140.0, t(4), 90.0),
            WeekGame::new(t(2), 105.5, t(3), 104.9),
        ],
        4 => vec![
            WeekGame::new(t(1), 115.0, t(2), 101.0),
            WeekGame::new(t(3), 99.0, t(4), 95.0).with_bracket(BracketTag::None),
        ],
        5 => vec![
            WeekGame::new(t(1), 125.0, t(3), 119.0),
            WeekGame::new(t(2), 92.0, t(4), 96.5).with_bracket(BracketTag::ConsolationLadder),
        ],
        _ => Vec::new(),
    }
}

fn form(member: MemberId, week: u32, winners: &[u32]) -> PredictionForm {
    let mut f = PredictionForm::blank(
        member,
        week,
        Utc.with_ymd_and_hms(2023, 9, 5 + week, 12, 0, 0).unwrap(),
    );
    f.picked_winners = winners.iter().map(|id| t(*id)).collect();
    f
}

fn forms_for(week: u32) -> Vec<PredictionForm> {
    match week {
        1 => {
            let mut a = form(ALICE, 1, &[1, 3]);
            a.blowout_guess = Some(MatchupKey::new(t(1), t(2)));
            a.highest_guess = Some(t(1));
            a.exact_high_guess = Some("120.0".into());
            let b = form(BOB, 1, &[2, 4]);
            vec![a, b]
        }
        2 => vec![form(ALICE, 2, &[1, 2]), form(BOB, 2, &[3, 2]), form(CARA, 2, &[3, 2])],
        3 => vec![form(ALICE, 3, &[1, 2]), form(BOB, 3, &[1, 3])],
        4 => vec![form(BOB, 4, &[1, 3])],
        5 => vec![form(ALICE, 5, &[1, 4]), form(BOB, 5, &[3, 2])],
        _ => Vec::new(),
    }
}

/// Grade every week in order and return the final standings plus the
/// labelled game records and each member's weekly totals.
fn replay(rules: Ruleset) -> (Vec<StandingsRow>, Vec<GameRecord>, Vec<Vec<u32>>) {
    let shape = shape();
    let roster = [ALICE, BOB, CARA];
    let mut rows: Vec<StandingsRow> = Vec::new();
    let mut records = Vec::new();
    let mut weekly = vec![Vec::new(); roster.len()];

    for week in 1..=shape.final_week() {
        let round = classify(&shape, week);
        let results = summarize(&games_for(week), &round);
        assert!(results.skipped.is_empty());

        let scores = score_week(&forms_for(week), &results.summary);
        rows = advance_week(week, &roster, &rows, &scores.breakdowns, rules);
        records.extend(label_week(2023, &round, &results.counted));

        for (i, row) in rows.iter().enumerate() {
            weekly[i].push(row.week_total);
        }
    }
    (rows, records, weekly)
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn final_week_is_the_two_round_final() {
    assert_eq!(shape().final_week(), 5);
    assert!(classify(&shape(), 5).is_finals);
}

#[test]
fn week_one_pin_and_bonuses_land() {
    let round = classify(&shape(), 1);
    let results = summarize(&games_for(1), &round);
    let scores = score_week(&forms_for(1), &results.summary);

    let alice = scores.get(ALICE).unwrap();
    assert_eq!(alice.matchup_points, 2);
    assert_eq!(alice.blowout_bonus, 1);
    // Right scorer (+1), sole pin guess (+1), within a point of 120.4 (+1).
    assert_eq!(alice.highest_bonus, 3);
    assert_eq!(scores.get(BOB).unwrap().total(), 0);
}

#[test]
fn standings_match_a_single_fold_of_weekly_totals() {
    for rules in [Ruleset { drop_lowest: true }, Ruleset { drop_lowest: false }] {
        let (rows, _, weekly) = replay(rules);
        assert_eq!(rows.len(), 3);
        for (row, totals) in rows.iter().zip(&weekly) {
            assert_eq!(
                (row.cumulative_total, row.dropped_low_week_value),
                fold_season(totals, rules),
                "{} under {rules:?}",
                row.member
            );
        }
    }
}

#[test]
fn members_who_never_submitted_early_are_backfilled() {
    let (rows, _, weekly) = replay(Ruleset::default());
    let cara = rows.iter().find(|r| r.member == CARA).unwrap();
    assert_eq!(weekly[2][0], 0);
    assert_eq!(cara.week, 5);
    assert_eq!(cara.cumulative_total, weekly[2].iter().sum::<u32>());
}

#[test]
fn labelled_records_feed_history() {
    let (_, records, _) = replay(Ruleset::default());
    assert_eq!(records.len(), 10);

    let podium = podium(&records);
    assert_eq!(podium.len(), 1);
    assert_eq!(podium[0].champion, t(1));
    assert_eq!(podium[0].runner_up, t(3));

    assert_eq!(last_place(&records), vec![(2023, t(2))]);
}
