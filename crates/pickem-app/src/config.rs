// Configuration loading and parsing (league.toml).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use directories::ProjectDirs;
use pickem_core::schedule::Schedule;
use pickem_core::{LeagueShape, MemberId, Ruleset, TeamId};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub league: LeagueConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub members: Vec<MemberConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub season: i32,
    pub league_id: u64,
    /// Bracket structure. Optional so a league can be registered before the
    /// host publishes its settings; grading refuses to run without it.
    #[serde(default)]
    pub shape: Option<LeagueShape>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub drop_lowest: bool,
    /// Seed for the waiver-order coin flip.
    #[serde(default)]
    pub tiebreak_seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Week 1 opens on the first Tuesday on or after this date.
    pub season_start: NaiveDate,
    #[serde(default)]
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberConfig {
    pub id: MemberId,
    pub team_id: TeamId,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Empty means the platform data directory.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub results_dir: String,
    /// Exported prediction forms, imported before each grading run.
    #[serde(default = "default_forms_dir")]
    pub forms_dir: String,
}

fn default_forms_dir() -> String {
    "data/forms".into()
}

impl Config {
    pub fn ruleset(&self) -> Ruleset {
        Ruleset {
            drop_lowest: self.rules.drop_lowest,
        }
    }

    pub fn member_for_team(&self, team: TeamId) -> Option<&MemberConfig> {
        self.members.iter().find(|m| m.team_id == team)
    }

    pub fn member(&self, id: MemberId) -> Option<&MemberConfig> {
        self.members.iter().find(|m| m.id == id)
    }

    /// League-local offset from UTC. Validated at load time.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.schedule.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    /// Prediction week windows covering the regular season and playoffs.
    /// Without a league shape, only week 1 is known.
    pub fn week_schedule(&self) -> Schedule {
        let weeks = self.league.shape.map_or(1, |s| s.final_week());
        Schedule::new(self.schedule.season_start, weeks, self.utc_offset())
    }

    /// Resolve the database location: the configured path, or `pickem.db`
    /// under the platform data directory when none is set.
    pub fn db_path(&self) -> PathBuf {
        if !self.database.path.is_empty() {
            return PathBuf::from(&self.database.path);
        }
        match ProjectDirs::from("", "", "pickem") {
            Some(dirs) => dirs.data_dir().join("pickem.db"),
            None => PathBuf::from("pickem.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let text = read_file(&league_path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: league_path.clone(),
        source: e,
    })?;

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.name.trim().is_empty() {
        return Err(invalid("league.name", "must not be empty"));
    }

    if let Some(shape) = &config.league.shape {
        shape
            .validate()
            .map_err(|e| invalid("league.shape", e.to_string()))?;
    }

    if !(-23..=23).contains(&config.schedule.utc_offset_hours) {
        return Err(invalid(
            "schedule.utc_offset_hours",
            format!(
                "must be between -23 and 23, got {}",
                config.schedule.utc_offset_hours
            ),
        ));
    }

    if config.members.is_empty() {
        return Err(invalid("members", "at least one member is required"));
    }

    let mut member_ids = HashSet::new();
    let mut team_ids = HashSet::new();
    for m in &config.members {
        if !member_ids.insert(m.id) {
            return Err(invalid("members.id", format!("duplicate member id {}", m.id.0)));
        }
        if !team_ids.insert(m.team_id) {
            return Err(invalid(
                "members.team_id",
                format!("team {} is claimed by more than one member", m.team_id.0),
            ));
        }
    }

    if let Some(shape) = &config.league.shape {
        if config.members.len() > shape.team_count as usize {
            return Err(invalid(
                "members",
                format!(
                    "{} members for a {}-team league",
                    config.members.len(),
                    shape.team_count
                ),
            ));
        }
    }

    if config.data.results_dir.trim().is_empty() {
        return Err(invalid("data.results_dir", "must not be empty"));
    }
    if config.data.forms_dir.trim().is_empty() {
        return Err(invalid("data.forms_dir", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
