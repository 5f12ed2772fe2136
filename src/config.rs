//! Configuration for the visit agenda
//!
//! Process arguments come from clap (with environment fallbacks); the board
//! vocabulary (checklist stages, period names, targets) comes from an
//! optional `settings.json` in the data directory. Both are read once at
//! start and passed down by reference.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::{AgendaError, Result};
use crate::schedule::PeriodTable;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// Field visit agenda
#[derive(Parser, Debug, Clone)]
#[command(name = "visit-agenda")]
#[command(about = "Checklist board for field visits to establishments")]
pub struct Args {
    /// Directory holding visits.json, meta.json, auth.json and settings.json
    #[arg(long, env = "VISIT_AGENDA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// User acting on the board
    #[arg(long, short, env = "VISIT_AGENDA_USER")]
    pub user: Option<String>,

    /// Password of the acting user
    #[arg(long, short, env = "VISIT_AGENDA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage the credential table
    #[command(subcommand)]
    User(UserCommand),
    /// Show every visit in schedule order
    List,
    /// Show every mission across visits in schedule order
    Missions,
    /// Show checklist progress
    Progress,
    /// Add a new establishment to visit
    Add(AddVisitArgs),
    /// Mark a checklist stage as done
    Check { visit_id: String, stage: String },
    /// Mark a checklist stage as not done
    Uncheck { visit_id: String, stage: String },
    /// Edit a visit
    Edit(EditVisitArgs),
    /// Manage the missions of a visit
    #[command(subcommand)]
    Mission(MissionCommand),
    /// Export the agenda as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Add a user (the first user needs no credentials)
    Add { name: String, password: String },
    /// Change the acting user's password
    Passwd { new_password: String },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AddVisitArgs {
    pub location: String,
    /// Date/time descriptor, e.g. "18/01/2026 - Manhã" or "18/01/2026 - 14:00"
    #[arg(long, default_value = "")]
    pub date_time: String,
    /// High, Medium, Low or empty
    #[arg(long, default_value = "")]
    pub priority: String,
    #[arg(long, default_value = "")]
    pub assignee: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EditVisitArgs {
    pub visit_id: String,
    #[arg(long)]
    pub date_time: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MissionCommand {
    /// Add a mission to a visit
    Add {
        visit_id: String,
        title: String,
        #[arg(long, default_value = "")]
        date_time: String,
    },
    /// Mark a mission as done
    Done { visit_id: String, mission_id: String },
    /// Mark a mission as pending again
    Reopen { visit_id: String, mission_id: String },
    /// Edit a mission
    Edit {
        visit_id: String,
        mission_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date_time: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

/// A named period mapped to an approximate clock time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeriodSetting {
    pub label: String,
    pub time: String,
}

/// Board vocabulary, loaded from `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stages: Vec<String>,
    pub periods: Vec<PeriodSetting>,
    pub undetermined_label: String,
    pub fallback_time: String,
    pub visit_target: u32,
    pub pbkdf2_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let period = |label: &str, time: &str| PeriodSetting {
            label: label.to_string(),
            time: time.to_string(),
        };
        Self {
            stages: vec![
                "Capture".to_string(),
                "Product Registration".to_string(),
                "Account Linking".to_string(),
            ],
            periods: vec![
                period("manhã", "09:00"),
                period("morning", "09:00"),
                period("durante o dia", "13:00"),
                period("during the day", "13:00"),
                period("fim do dia", "18:00"),
                period("end of day", "18:00"),
            ],
            undetermined_label: "A Definir".to_string(),
            fallback_time: "12:00".to_string(),
            visit_target: 20,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl Settings {
    /// Load `settings.json` from `dir`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path).map_err(|err| AgendaError::io(&path, err))?;
        let settings: Settings =
            serde_json::from_str(raw.as_str()).map_err(|err| AgendaError::json(&path, err))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(AgendaError::Config(
                "at least one checklist stage is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.trim().is_empty() {
                return Err(AgendaError::Config("checklist stage names cannot be empty".to_string()));
            }
            if !seen.insert(stage.as_str()) {
                return Err(AgendaError::Config(format!("duplicate checklist stage: {stage}")));
            }
        }
        if self.undetermined_label.trim().is_empty() {
            return Err(AgendaError::Config("undetermined_label cannot be empty".to_string()));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(AgendaError::Config("pbkdf2_iterations must be positive".to_string()));
        }
        self.period_table().map(|_| ())
    }

    /// Build the period lookup used by the schedule key.
    pub fn period_table(&self) -> Result<PeriodTable> {
        let fallback = parse_clock(self.fallback_time.as_str()).ok_or_else(|| {
            AgendaError::Config(format!("invalid fallback_time: {}", self.fallback_time))
        })?;
        let mut table = PeriodTable::new(self.undetermined_label.as_str(), fallback);
        for period in &self.periods {
            let minutes = parse_clock(period.time.as_str()).ok_or_else(|| {
                AgendaError::Config(format!(
                    "invalid time {} for period {}",
                    period.time, period.label
                ))
            })?;
            table = table.with_period(period.label.as_str(), minutes);
        }
        Ok(table)
    }
}

/// Parse a strict `HH:MM` clock time into minutes since midnight.
pub fn parse_clock(value: &str) -> Option<i64> {
    let (hh, mm) = value.trim().split_once(':')?;
    if hh.is_empty() || mm.len() != 2 || !hh.chars().chain(mm.chars()).all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let hours = hh.parse::<i64>().ok()?;
    let minutes = mm.parse::<i64>().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        settings.validate().expect("defaults are valid");
        assert_eq!(settings.stages.len(), 3);
        assert_eq!(settings.visit_target, 20);
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("09:00"), Some(540));
        assert_eq!(parse_clock("7:30"), Some(450));
        assert_eq!(parse_clock("24:00"), None);
        assert_eq!(parse_clock("12:5"), None);
        assert_eq!(parse_clock("noon"), None);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().expect("tempdir");
        let settings = Settings::load(dir.path()).expect("load");
        assert_eq!(settings.undetermined_label, "A Definir");
    }

    #[test]
    fn test_load_partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "stages": ["Visit", "Demo"], "visit_target": 5 }"#,
        )
        .expect("write settings");
        let settings = Settings::load(dir.path()).expect("load");
        assert_eq!(settings.stages, vec!["Visit", "Demo"]);
        assert_eq!(settings.visit_target, 5);
        assert_eq!(settings.fallback_time, "12:00");
    }

    #[test]
    fn test_rejects_duplicate_stages_and_bad_times() {
        let mut settings = Settings::default();
        settings.stages.push("Capture".to_string());
        assert!(matches!(settings.validate(), Err(AgendaError::Config(_))));

        let mut settings = Settings::default();
        settings.periods[0].time = "9am".to_string();
        assert!(matches!(settings.validate(), Err(AgendaError::Config(_))));
    }
}
