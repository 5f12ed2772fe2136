//! visit-agenda: command-line front end for the visit board

use std::fs;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use visit_agenda::auth::Credentials;
use visit_agenda::board::{self, MissionPatch, NewVisit, VisitPatch};
use visit_agenda::config::{Args, Command, MissionCommand, Settings, UserCommand};
use visit_agenda::export::agenda_csv;
use visit_agenda::model::{self, is_truthy, status_badge, value_string};
use visit_agenda::schedule::PeriodTable;
use visit_agenda::store::Store;
use visit_agenda::AgendaError;

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("visit_agenda={},warn", args.log_level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let user_error = err
                .downcast_ref::<AgendaError>()
                .is_some_and(AgendaError::is_user_error);
            if user_error {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let settings = Settings::load(&args.data_dir)?;
    let mut credentials = Credentials::load(&args.data_dir, settings.pbkdf2_iterations)?;

    match &args.command {
        Command::User(UserCommand::Add { name, password }) => {
            let acting = match (args.user.as_deref(), args.password.as_deref()) {
                (Some(user), Some(pass)) => Some((user, pass)),
                _ => None,
            };
            credentials.add_user(acting, name, password)?;
            println!("User {} saved.", name.trim());
            return Ok(());
        }
        Command::User(UserCommand::Passwd { new_password }) => {
            let (user, password) = actor(&args)?;
            credentials.change_password(user, password, new_password)?;
            println!("Password changed.");
            return Ok(());
        }
        _ => {}
    }

    if credentials.is_empty() {
        return Err(AgendaError::NoUsers.into());
    }
    let (user, password) = actor(&args)?;
    credentials.verify(user, password)?;
    debug!(user, "authenticated");

    let mut store = Store::open(&args.data_dir, &settings)?;
    if let Some(version) = store.upgraded_from() {
        println!("Visit records upgraded from schema version {version}.");
    }
    let periods = settings.period_table()?;
    let stamp = model::stamp(user, Local::now().naive_local());

    match args.command {
        Command::User(_) => {}
        Command::List => print_board(store.visits(), &settings, &periods),
        Command::Missions => print_missions(store.visits(), &periods),
        Command::Progress => print_progress(store.visits(), &settings),
        Command::Add(add) => {
            let visit = NewVisit {
                location: add.location,
                date_time: add.date_time,
                priority: add.priority,
                assignee: add.assignee,
            };
            let id = board::add_visit(store.visits_mut(), &settings, visit, &stamp)?;
            store.save()?;
            println!("Added {id}");
        }
        Command::Check { visit_id, stage } => {
            let changed = board::set_stage(store.visits_mut(), &settings, &visit_id, &stage, true, &stamp)?;
            save_if_changed(&store, changed)?;
        }
        Command::Uncheck { visit_id, stage } => {
            let changed = board::set_stage(store.visits_mut(), &settings, &visit_id, &stage, false, &stamp)?;
            save_if_changed(&store, changed)?;
        }
        Command::Edit(edit) => {
            let patch = VisitPatch {
                date_time: edit.date_time,
                priority: edit.priority,
                assignee: edit.assignee,
                notes: edit.notes,
            };
            let changed = board::update_visit(store.visits_mut(), &settings, &edit.visit_id, patch, &stamp)?;
            save_if_changed(&store, changed)?;
        }
        Command::Mission(MissionCommand::Add {
            visit_id,
            title,
            date_time,
        }) => {
            let id = board::add_mission(store.visits_mut(), &settings, &visit_id, &title, &date_time, &stamp)?;
            store.save()?;
            println!("Added mission {id}");
        }
        Command::Mission(MissionCommand::Done { visit_id, mission_id }) => {
            let patch = MissionPatch {
                done: Some(true),
                ..MissionPatch::default()
            };
            let changed =
                board::update_mission(store.visits_mut(), &settings, &visit_id, &mission_id, patch, &stamp)?;
            save_if_changed(&store, changed)?;
        }
        Command::Mission(MissionCommand::Reopen { visit_id, mission_id }) => {
            let patch = MissionPatch {
                done: Some(false),
                ..MissionPatch::default()
            };
            let changed =
                board::update_mission(store.visits_mut(), &settings, &visit_id, &mission_id, patch, &stamp)?;
            save_if_changed(&store, changed)?;
        }
        Command::Mission(MissionCommand::Edit {
            visit_id,
            mission_id,
            title,
            date_time,
            notes,
        }) => {
            let patch = MissionPatch {
                done: None,
                title,
                date_time,
                notes,
            };
            let changed =
                board::update_mission(store.visits_mut(), &settings, &visit_id, &mission_id, patch, &stamp)?;
            save_if_changed(&store, changed)?;
        }
        Command::Export { out } => {
            let csv = agenda_csv(store.visits(), &settings)?;
            match out {
                Some(path) => {
                    fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Agenda written to {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }
    Ok(())
}

fn actor(args: &Args) -> anyhow::Result<(&str, &str)> {
    let user = args
        .user
        .as_deref()
        .context("--user (or VISIT_AGENDA_USER) is required")?;
    let password = args
        .password
        .as_deref()
        .context("--password (or VISIT_AGENDA_PASSWORD) is required")?;
    Ok((user, password))
}

fn save_if_changed(store: &Store, changed: bool) -> anyhow::Result<()> {
    if changed {
        store.save()?;
        println!("Saved.");
    } else {
        println!("Nothing to change.");
    }
    Ok(())
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn print_board(visits: &[Value], settings: &Settings, periods: &PeriodTable) {
    let rows = board::visit_overview(visits, periods);
    if rows.is_empty() {
        println!("No visits yet.");
        return;
    }
    for row in rows {
        println!("{}  {} | {}  ({})", status_badge(&row.status), row.location, row.date_time, row.id);
        println!(
            "    priority: {}  assignee: {}  updated: {}",
            or_dash(&row.priority),
            or_dash(&row.assignee),
            or_dash(&row.last_update)
        );
        let Ok(visit) = board::find_visit(visits, &row.id) else {
            continue;
        };
        let checklist = visit.get(model::CHECKLIST).and_then(Value::as_object);
        for stage in &settings.stages {
            let done = checklist
                .and_then(|checklist| checklist.get(stage.as_str()))
                .is_some_and(is_truthy);
            println!("    [{}] {stage}", if done { "x" } else { " " });
        }
        let notes = value_string(visit, model::NOTES);
        if !notes.is_empty() {
            println!("    notes: {notes}");
        }
        for mission in board::sorted_missions(visit, periods) {
            println!(
                "    - {} | {} | {}  ({})",
                value_string(mission, model::STATUS),
                value_string(mission, model::TITLE),
                model::date_time_of(mission),
                model::id_of(mission)
            );
        }
    }
}

fn print_missions(visits: &[Value], periods: &PeriodTable) {
    let rows = board::mission_overview(visits, periods);
    if rows.is_empty() {
        println!("No missions yet.");
        return;
    }
    for row in rows {
        println!(
            "{} | {} | {} | {} | {}",
            row.location,
            row.title,
            row.date_time,
            row.status,
            or_dash(&row.last_update)
        );
    }
}

fn print_progress(visits: &[Value], settings: &Settings) {
    let progress = board::progress(visits, settings);
    println!("Stages done: {}/{}", progress.stages_done, progress.stages_target);
    println!("Visits done: {}/{}", progress.visits_done, progress.visit_target);
    println!("Progress: {:.1}%", progress.ratio() * 100.0);
}
