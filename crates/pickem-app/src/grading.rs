// Week grading pipeline: pull a week's games and forms through the engine
// and persist the resulting standings and game records.

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use pickem_core::bracket::RoundInfo;
use pickem_core::record::{label_week, GameRecord};
use pickem_core::results::{summarize, WeekSummary};
use pickem_core::schedule::Schedule;
use pickem_core::scoring::{score_week, WeekScores};
use pickem_core::standings::{advance_week, StandingsRow};
use pickem_core::tiebreak::{
    adjusted_record, draft_order, waiver_order, DraftEntry, TeamRecord, WaiverEntry, WaiverSlot,
};
use pickem_core::{EngineError, LeagueShape, MemberId, Ruleset, TeamId, WeekContext};

use crate::config::Config;
use crate::providers::{LeagueShapeProvider, PredictionStore, StandingsStore, WeekResultsProvider};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// The league facts grading needs, lifted out of the config.
#[derive(Debug, Clone)]
pub struct LeagueContext {
    pub name: String,
    pub season: i32,
    /// Every member with the team they manage.
    pub members: Vec<(MemberId, TeamId)>,
    pub rules: Ruleset,
    pub tiebreak_seed: u64,
    pub schedule: Schedule,
}

impl LeagueContext {
    pub fn from_config(config: &Config) -> Self {
        LeagueContext {
            name: config.league.name.clone(),
            season: config.league.season,
            members: config.members.iter().map(|m| (m.id, m.team_id)).collect(),
            rules: config.ruleset(),
            tiebreak_seed: config.rules.tiebreak_seed,
            schedule: config.week_schedule(),
        }
    }

    pub fn roster(&self) -> Vec<MemberId> {
        self.members.iter().map(|(m, _)| *m).collect()
    }
}

/// The collaborators one grading run talks to.
pub struct Collaborators<'a> {
    pub shapes: &'a dyn LeagueShapeProvider,
    pub results: &'a dyn WeekResultsProvider,
    pub predictions: &'a dyn PredictionStore,
    pub standings: &'a dyn StandingsStore,
}

/// Everything produced by grading one week.
#[derive(Debug, Clone)]
pub struct GradedWeek {
    pub week: u32,
    pub round: RoundInfo,
    pub summary: WeekSummary,
    pub scores: WeekScores,
    pub rows: Vec<StandingsRow>,
    pub records: Vec<GameRecord>,
    /// Members whose form arrived after the deadline and was not scored.
    pub late: Vec<MemberId>,
}

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

async fn require_shape(ctx: &LeagueContext, deps: &Collaborators<'_>) -> Result<LeagueShape> {
    match deps.shapes.league_shape(ctx.season).await? {
        Some(shape) => Ok(shape),
        None => Err(EngineError::MissingLeagueShape {
            league: ctx.name.clone(),
            season: ctx.season,
        }
        .into()),
    }
}

/// Grade one week and persist the result.
///
/// Week `n > 1` can only be graded once week `n - 1` has been. The latest
/// graded week may be regraded, overwriting its rows; earlier weeks are
/// frozen because later standings were accumulated from them.
pub async fn grade_week(
    ctx: &LeagueContext,
    deps: &Collaborators<'_>,
    week: u32,
) -> Result<GradedWeek> {
    let shape = require_shape(ctx, deps).await?;
    if week == 0 || week > shape.final_week() {
        bail!(
            "week {week} is outside the {} season (weeks 1 to {})",
            ctx.season,
            shape.final_week()
        );
    }

    let last = deps.standings.last_graded_week(ctx.season).await?;
    if week > 1 && last.map_or(true, |l| l < week - 1) {
        return Err(EngineError::WeekOutOfOrder {
            week,
            missing: last.map_or(1, |l| l + 1),
        }
        .into());
    }
    if let Some(last_graded) = last.filter(|l| *l > week) {
        return Err(EngineError::WeekSuperseded { week, last_graded }.into());
    }

    let week_ctx = WeekContext::new(ctx.season, week, shape, ctx.rules);
    let round = week_ctx.round();
    debug!("grading week {week}: {round:?}");

    let games = deps
        .results
        .week_games(ctx.season, week)
        .await
        .with_context(|| format!("failed to fetch week {week} results"))?;
    let results = summarize(&games, &round);
    if !results.skipped.is_empty() {
        warn!(
            "week {week}: {} of {} games skipped as incomplete",
            results.skipped.len(),
            games.len()
        );
    }

    let all_forms = deps
        .predictions
        .forms_for_week(ctx.season, week)
        .await
        .with_context(|| format!("failed to load week {week} prediction forms"))?;
    let (forms, late): (Vec<_>, Vec<_>) = all_forms
        .into_iter()
        .partition(|f| ctx.schedule.accepts_submission(week, f.submitted_at));
    let late: Vec<MemberId> = late.into_iter().map(|f| f.member).collect();
    for member in &late {
        warn!("{member}: week {week} form arrived after the deadline; not scored");
    }

    let scores = score_week(&forms, &results.summary);

    let prior = if week > 1 {
        deps.standings.standings(ctx.season, week - 1).await?
    } else {
        Vec::new()
    };
    let rows = advance_week(week, &ctx.roster(), &prior, &scores.breakdowns, week_ctx.rules);
    let records = label_week(week_ctx.season, &round, &results.counted);

    deps.standings
        .commit_week(ctx.season, week, &rows, &records)
        .await
        .with_context(|| format!("failed to store week {week} standings"))?;

    info!(
        "graded week {week}: {} games counted, {} forms scored, {} late",
        results.counted.len(),
        scores.breakdowns.len(),
        late.len()
    );

    Ok(GradedWeek {
        week,
        round,
        summary: results.summary,
        scores,
        rows,
        records,
        late,
    })
}

/// Grade every ungraded week up to and including `last_week`, in order.
pub async fn grade_through(
    ctx: &LeagueContext,
    deps: &Collaborators<'_>,
    last_week: u32,
) -> Result<Vec<GradedWeek>> {
    let first = deps
        .standings
        .last_graded_week(ctx.season)
        .await?
        .map_or(1, |l| l + 1);

    let mut graded = Vec::new();
    for week in first..=last_week {
        graded.push(grade_week(ctx, deps, week).await?);
    }
    if graded.is_empty() {
        info!("nothing to grade through week {last_week}");
    }
    Ok(graded)
}

// ---------------------------------------------------------------------------
// Tiebreakers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TiebreakReport {
    pub week: u32,
    /// `None` in the finals week.
    pub waiver: Option<Vec<WaiverSlot>>,
    pub draft: Vec<DraftEntry>,
}

/// Waiver order and draft-selection standings after a graded week.
pub async fn tiebreakers(
    ctx: &LeagueContext,
    deps: &Collaborators<'_>,
    week: u32,
) -> Result<TiebreakReport> {
    let shape = require_shape(ctx, deps).await?;
    let rows = deps.standings.standings(ctx.season, week).await?;
    if rows.is_empty() {
        bail!("week {week} has not been graded");
    }
    let teams = deps.results.team_snapshots(ctx.season).await?;

    let team_of = |member: MemberId| {
        ctx.members
            .iter()
            .find(|(m, _)| *m == member)
            .map(|(_, t)| *t)
    };
    let snapshot_of = |member: MemberId| {
        team_of(member).and_then(|team| teams.iter().find(|s| s.team == team))
    };

    let mut waiver_entries = Vec::new();
    let mut draft_entries = Vec::new();
    for row in &rows {
        let snapshot = snapshot_of(row.member);
        if snapshot.is_none() {
            warn!("{}: no team line found; tiebreaking with an empty record", row.member);
        }
        let record = snapshot.map_or_else(TeamRecord::default, |s| {
            adjusted_record(
                TeamRecord {
                    wins: s.wins,
                    points_for: s.points_for,
                },
                &s.playoff_weeks,
                &shape,
                week,
            )
        });
        waiver_entries.push(WaiverEntry {
            member: row.member,
            week_points: row.week_total,
            record,
        });
        draft_entries.push(DraftEntry {
            member: row.member,
            season_total: row.cumulative_total,
            final_standing: snapshot.and_then(|s| s.final_standing),
        });
    }

    Ok(TiebreakReport {
        week,
        waiver: waiver_order(&waiver_entries, &shape, ctx.tiebreak_seed, ctx.season, week),
        draft: draft_order(&draft_entries),
    })
}
