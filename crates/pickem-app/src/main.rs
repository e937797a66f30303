// Pick'em grader entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database
// 4. Import exported forms, then grade every completed, ungraded week
// 5. Print standings, tiebreakers and league history

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use pickem_app::config::{self, Config};
use pickem_app::db::Database;
use pickem_app::forms_json;
use pickem_app::grading::{self, Collaborators, LeagueContext};
use pickem_app::results_csv::CsvResults;
use pickem_core::history::{last_place, podium};
use pickem_core::tiebreak::DecidedBy;
use pickem_core::{MemberId, TeamId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("pickem starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, season {}, {} members",
        config.league.name,
        config.league.season,
        config.members.len()
    );

    // 3. Open database
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path_str = db_path.to_string_lossy();
    let db = Database::open(&db_path_str).context("failed to open database")?;
    info!("Database opened at {}", db_path_str);

    // 4. Grade. An explicit week argument overrides the schedule.
    let ctx = LeagueContext::from_config(&config);
    let results = CsvResults::new(&config.data.results_dir);
    let deps = Collaborators {
        shapes: &config,
        results: &results,
        predictions: &db,
        standings: &db,
    };

    let target = match std::env::args().nth(1) {
        Some(arg) => Some(
            arg.parse::<u32>()
                .with_context(|| format!("week argument `{arg}` is not a number"))?,
        ),
        None => ctx.schedule.last_completed_week(Utc::now()),
    };
    let Some(target) = target else {
        println!("No prediction week has finished yet.");
        return Ok(());
    };

    forms_json::import_forms(
        Path::new(&config.data.forms_dir),
        ctx.season,
        target,
        &db,
    )
    .await
    .context("failed to import prediction forms")?;

    let graded = grading::grade_through(&ctx, &deps, target).await?;
    for week in &graded {
        println!(
            "Graded week {}: {} forms scored, {} late",
            week.week,
            week.scores.breakdowns.len(),
            week.late.len()
        );
    }

    // 5. Report
    print_standings(&config, &db, target)?;

    match grading::tiebreakers(&ctx, &deps, target).await {
        Ok(report) => {
            if let Some(waiver) = &report.waiver {
                println!("\nWeek {} waiver order:", report.week);
                for slot in waiver {
                    let note = match slot.decided_by {
                        DecidedBy::WeekPoints => "",
                        DecidedBy::Wins => " (wins)",
                        DecidedBy::PointsFor => " (wins, points)",
                        DecidedBy::CoinFlip => " (coin flip)",
                    };
                    println!(
                        "{} - {}{}",
                        slot.entry.week_points,
                        display_name(&config, slot.entry.member),
                        note
                    );
                }
            }
            println!("\nDraft selection standings for {}:", config.league.season);
            for entry in &report.draft {
                println!(
                    "{} - {}",
                    entry.season_total,
                    display_name(&config, entry.member)
                );
            }
        }
        Err(e) => warn!("tiebreakers unavailable: {e:#}"),
    }

    let records = db.load_game_records()?;
    let finishes = podium(&records);
    if !finishes.is_empty() {
        println!("\nPodium:");
        for p in &finishes {
            let third = p
                .third
                .map(|t| team_label(&config, t))
                .unwrap_or_else(|| "-".into());
            println!(
                "{}: {} / {} / {}",
                p.season,
                team_label(&config, p.champion),
                team_label(&config, p.runner_up),
                third
            );
        }
    }
    for (season, team) in last_place(&records) {
        println!("{season} last place: {}", team_label(&config, team));
    }

    info!("pickem finished");
    Ok(())
}

fn display_name(config: &Config, member: MemberId) -> String {
    config
        .member(member)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| member.to_string())
}

/// Team ids from past seasons may no longer map to a member.
fn team_label(config: &Config, team: TeamId) -> String {
    config
        .member_for_team(team)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| team.to_string())
}

fn print_standings(config: &Config, db: &Database, week: u32) -> anyhow::Result<()> {
    let mut rows = db.load_standings(config.league.season, week)?;
    if rows.is_empty() {
        println!("No standings for week {week}.");
        return Ok(());
    }
    rows.sort_by(|a, b| b.cumulative_total.cmp(&a.cumulative_total));

    println!("\nStandings through week {week}:");
    for row in rows {
        let dropped = row
            .dropped_low_week_value
            .map(|d| format!(" (dropped {d})"))
            .unwrap_or_default();
        println!(
            "{} - {}{}",
            row.cumulative_total,
            display_name(config, row.member),
            dropped
        );
    }
    Ok(())
}

/// Initialize tracing to log to `logs/pickem.log`, keeping stdout for the
/// report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("pickem.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pickem=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
