// Prediction form import from JSON exports.
//
// Layout under `data.forms_dir`:
//   <season>/week_01.json   array of forms submitted for that week
//
// Importing upserts into the prediction store, so re-running over the same
// files is harmless and a later export of a member's form replaces theirs.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use pickem_core::scoring::PredictionForm;
use pickem_core::{MatchupKey, MemberId, TeamId};

use crate::providers::PredictionStore;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FormsError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Raw JSON shape (private)
// ---------------------------------------------------------------------------

/// One exported form. Matchup guesses are written as a pair of team ids in
/// either order.
#[derive(Debug, Deserialize)]
struct RawForm {
    member: u32,
    week: u32,
    #[serde(default)]
    picks: Vec<u32>,
    #[serde(default)]
    blowout: Option<[u32; 2]>,
    #[serde(default)]
    closest: Option<[u32; 2]>,
    #[serde(default)]
    highest: Option<u32>,
    #[serde(default)]
    lowest: Option<u32>,
    #[serde(default)]
    exact_high: Option<String>,
    #[serde(default)]
    exact_low: Option<String>,
    submitted_at: DateTime<Utc>,
}

fn matchup(pair: Option<[u32; 2]>) -> Option<MatchupKey> {
    pair.map(|[a, b]| MatchupKey::new(TeamId(a), TeamId(b)))
}

impl From<RawForm> for PredictionForm {
    fn from(raw: RawForm) -> Self {
        PredictionForm {
            member: MemberId(raw.member),
            week: raw.week,
            picked_winners: raw.picks.into_iter().map(TeamId).collect(),
            blowout_guess: matchup(raw.blowout),
            closest_guess: matchup(raw.closest),
            highest_guess: raw.highest.map(TeamId),
            lowest_guess: raw.lowest.map(TeamId),
            exact_high_guess: raw.exact_high,
            exact_low_guess: raw.exact_low,
            submitted_at: raw.submitted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Parse a week's export. Forms labelled with another week are dropped.
fn load_forms_from_reader<R: Read>(
    rdr: R,
    week: u32,
) -> Result<Vec<PredictionForm>, serde_json::Error> {
    let raw: Vec<RawForm> = serde_json::from_reader(rdr)?;
    let mut forms = Vec::with_capacity(raw.len());
    for r in raw {
        if r.week != week {
            warn!(
                "member#{}: week {} form found in the week {week} export; skipping",
                r.member, r.week
            );
            continue;
        }
        forms.push(PredictionForm::from(r));
    }
    Ok(forms)
}

/// Load one week's forms from a JSON file.
pub fn load_week_forms(path: &Path, week: u32) -> Result<Vec<PredictionForm>, FormsError> {
    let file = std::fs::File::open(path).map_err(|e| FormsError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_forms_from_reader(file, week).map_err(|e| FormsError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn week_path(root: &Path, season: i32, week: u32) -> PathBuf {
    root.join(season.to_string()).join(format!("week_{week:02}.json"))
}

/// Import every week's export from 1 through `last_week` into `store`.
/// Weeks without an export file are skipped. Returns the number of forms
/// stored.
pub async fn import_forms(
    root: &Path,
    season: i32,
    last_week: u32,
    store: &dyn PredictionStore,
) -> Result<usize> {
    let mut stored = 0;
    for week in 1..=last_week {
        let path = week_path(root, season, week);
        if !path.exists() {
            debug!("no form export at {}", path.display());
            continue;
        }
        let forms = load_week_forms(&path, week)?;
        for form in &forms {
            store.save_form(season, form).await.with_context(|| {
                format!("failed to store week {week} form for {}", form.member)
            })?;
        }
        stored += forms.len();
    }
    info!("imported {stored} prediction forms through week {last_week}");
    Ok(stored)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
