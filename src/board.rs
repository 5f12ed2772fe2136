//! Board operations on the reconciled visit list
//!
//! Every operation validates its input before touching the list, so a
//! rejected call leaves the visits exactly as they were. Changes stamp the
//! record's `last_update` with the acting user.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{AgendaError, Result};
use crate::model::{
    date_time_of, has_id, id_of, is_truthy, value_string, MissionStatus, Priority, VisitStatus, ASSIGNEE,
    CHECKLIST, DATE_TIME, ID, LAST_UPDATE, LOCATION, MISSIONS, NOTES, PRIORITY, STATUS, TITLE,
};
use crate::reconcile::Schema;
use crate::schedule::{order_by_schedule, PeriodTable};

#[derive(Debug, Clone, Default)]
pub struct NewVisit {
    pub location: String,
    pub date_time: String,
    pub priority: String,
    pub assignee: String,
}

#[derive(Debug, Clone, Default)]
pub struct VisitPatch {
    pub date_time: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MissionPatch {
    pub done: Option<bool>,
    pub title: Option<String>,
    pub date_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stages_done: usize,
    pub stages_target: usize,
    pub visits_done: usize,
    pub visit_target: usize,
}

impl Progress {
    pub fn ratio(&self) -> f64 {
        if self.stages_target == 0 {
            return 0.0;
        }
        self.stages_done as f64 / self.stages_target as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRow {
    pub id: String,
    pub location: String,
    pub date_time: String,
    pub priority: String,
    pub assignee: String,
    pub status: String,
    pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRow {
    pub visit_id: String,
    pub location: String,
    pub mission_id: String,
    pub title: String,
    pub date_time: String,
    pub status: String,
    pub last_update: String,
}

/// Append a new visit and return its id.
pub fn add_visit(
    visits: &mut Vec<Value>,
    settings: &Settings,
    visit: NewVisit,
    stamp: &str,
) -> Result<String> {
    let location = visit.location.trim();
    if location.is_empty() {
        return Err(AgendaError::Validation("Location is required.".to_string()));
    }
    let priority = parse_priority(visit.priority.as_str())?;
    let id = Uuid::new_v4().to_string();
    visits.push(json!({
        ID: id,
        LOCATION: location,
        DATE_TIME: date_time_or_label(visit.date_time.as_str(), settings),
        CHECKLIST: Schema::from_settings(settings).empty_checklist(),
        STATUS: VisitStatus::Pending.as_str(),
        PRIORITY: priority.as_str(),
        ASSIGNEE: visit.assignee.trim(),
        NOTES: "",
        LAST_UPDATE: stamp,
        MISSIONS: [],
    }));
    Ok(id)
}

/// Mark `stage` done or not done. Returns whether anything changed.
pub fn set_stage(
    visits: &mut [Value],
    settings: &Settings,
    visit_id: &str,
    stage: &str,
    done: bool,
    stamp: &str,
) -> Result<bool> {
    let Some(stage) = settings.stages.iter().find(|name| name.as_str() == stage.trim()) else {
        return Err(AgendaError::UnknownStage(stage.to_string()));
    };
    let visit = find_visit_mut(visits, visit_id)?;
    if !visit.get(CHECKLIST).is_some_and(Value::is_object) {
        visit.insert(
            CHECKLIST.to_string(),
            Schema::from_settings(settings).empty_checklist(),
        );
    }

    let mut changed = false;
    if let Some(checklist) = visit.get_mut(CHECKLIST).and_then(Value::as_object_mut) {
        if checklist.get(stage).map(is_truthy).unwrap_or(false) != done {
            checklist.insert(stage.clone(), Value::Bool(done));
            changed = true;
        }
    }
    changed |= refresh_status(visit);
    if changed {
        visit.insert(LAST_UPDATE.to_string(), json!(stamp));
    }
    Ok(changed)
}

/// Apply the fields present in `patch`. Returns whether anything changed.
pub fn update_visit(
    visits: &mut [Value],
    settings: &Settings,
    visit_id: &str,
    patch: VisitPatch,
    stamp: &str,
) -> Result<bool> {
    let priority = patch
        .priority
        .as_deref()
        .map(parse_priority)
        .transpose()?;
    let visit = find_visit_mut(visits, visit_id)?;

    let mut changed = false;
    if let Some(date_time) = patch.date_time {
        changed |= set_text(visit, DATE_TIME, date_time_or_label(date_time.as_str(), settings));
    }
    if let Some(priority) = priority {
        changed |= set_text(visit, PRIORITY, priority.as_str().to_string());
    }
    if let Some(assignee) = patch.assignee {
        changed |= set_text(visit, ASSIGNEE, assignee.trim().to_string());
    }
    if let Some(notes) = patch.notes {
        changed |= set_text(visit, NOTES, notes);
    }
    changed |= refresh_status(visit);
    if changed {
        visit.insert(LAST_UPDATE.to_string(), json!(stamp));
    }
    Ok(changed)
}

/// Attach a new pending mission to a visit and return its id.
pub fn add_mission(
    visits: &mut [Value],
    settings: &Settings,
    visit_id: &str,
    title: &str,
    date_time: &str,
    stamp: &str,
) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AgendaError::Validation("Mission title is required.".to_string()));
    }
    let visit = find_visit_mut(visits, visit_id)?;
    if !visit.get(MISSIONS).is_some_and(Value::is_array) {
        visit.insert(MISSIONS.to_string(), json!([]));
    }

    let id = Uuid::new_v4().to_string();
    if let Some(missions) = visit.get_mut(MISSIONS).and_then(Value::as_array_mut) {
        missions.push(json!({
            ID: id,
            TITLE: title,
            DATE_TIME: date_time_or_label(date_time, settings),
            STATUS: MissionStatus::Pending.as_str(),
            NOTES: "",
            LAST_UPDATE: stamp,
        }));
    }
    visit.insert(LAST_UPDATE.to_string(), json!(stamp));
    Ok(id)
}

/// Apply `patch` to one mission. Returns whether anything changed.
pub fn update_mission(
    visits: &mut [Value],
    settings: &Settings,
    visit_id: &str,
    mission_id: &str,
    patch: MissionPatch,
    stamp: &str,
) -> Result<bool> {
    if patch.title.as_deref().is_some_and(|title| title.trim().is_empty()) {
        return Err(AgendaError::Validation("Mission title is required.".to_string()));
    }
    let visit = find_visit_mut(visits, visit_id)?;
    let mission = visit
        .get_mut(MISSIONS)
        .and_then(Value::as_array_mut)
        .and_then(|missions| {
            missions
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .find(|mission| has_id(mission, mission_id))
        })
        .ok_or_else(|| AgendaError::NotFound {
            kind: "Mission",
            id: mission_id.to_string(),
        })?;

    let mut changed = false;
    if let Some(done) = patch.done {
        let current = MissionStatus::parse(
            mission.get(STATUS).and_then(Value::as_str).unwrap_or(""),
        );
        let next = MissionStatus::from_done(done);
        if current != next || mission.get(STATUS).and_then(Value::as_str) != Some(next.as_str()) {
            mission.insert(STATUS.to_string(), json!(next.as_str()));
            changed = true;
        }
    }
    if let Some(title) = patch.title {
        changed |= set_text(mission, TITLE, title.trim().to_string());
    }
    if let Some(date_time) = patch.date_time {
        changed |= set_text(mission, DATE_TIME, date_time_or_label(date_time.as_str(), settings));
    }
    if let Some(notes) = patch.notes {
        changed |= set_text(mission, NOTES, notes);
    }
    if changed {
        mission.insert(LAST_UPDATE.to_string(), json!(stamp));
        visit.insert(LAST_UPDATE.to_string(), json!(stamp));
    }
    Ok(changed)
}

/// Checklist totals. Missions do not count.
pub fn progress(visits: &[Value], settings: &Settings) -> Progress {
    let stages_done = visits
        .iter()
        .filter_map(|visit| visit.get(CHECKLIST).and_then(Value::as_object))
        .map(|checklist| checklist.values().filter(|value| is_truthy(value)).count())
        .sum();
    let visits_done = visits
        .iter()
        .filter(|visit| {
            visit
                .get(STATUS)
                .and_then(Value::as_str)
                .and_then(VisitStatus::parse)
                == Some(VisitStatus::Done)
        })
        .count();
    let visit_target = settings.visit_target as usize;
    Progress {
        stages_done,
        stages_target: visit_target * settings.stages.len(),
        visits_done,
        visit_target,
    }
}

/// One row per visit, in schedule order.
pub fn visit_overview(visits: &[Value], periods: &PeriodTable) -> Vec<VisitRow> {
    let rows: Vec<VisitRow> = visits
        .iter()
        .filter(|visit| visit.is_object())
        .map(|visit| VisitRow {
            id: id_of(visit),
            location: value_string(visit, LOCATION),
            date_time: value_string(visit, DATE_TIME),
            priority: value_string(visit, PRIORITY),
            assignee: value_string(visit, ASSIGNEE),
            status: value_string(visit, STATUS),
            last_update: value_string(visit, LAST_UPDATE),
        })
        .collect();
    order_by_schedule(rows, periods, |row| row.date_time.as_str())
}

/// Every mission across all visits, in schedule order.
pub fn mission_overview(visits: &[Value], periods: &PeriodTable) -> Vec<MissionRow> {
    let mut rows = Vec::new();
    for visit in visits.iter().filter(|visit| visit.is_object()) {
        let missions = visit.get(MISSIONS).and_then(Value::as_array);
        for mission in missions.into_iter().flatten().filter(|m| m.is_object()) {
            rows.push(MissionRow {
                visit_id: id_of(visit),
                location: value_string(visit, LOCATION),
                mission_id: id_of(mission),
                title: value_string(mission, TITLE),
                date_time: value_string(mission, DATE_TIME),
                status: value_string(mission, STATUS),
                last_update: value_string(mission, LAST_UPDATE),
            });
        }
    }
    order_by_schedule(rows, periods, |row| row.date_time.as_str())
}

/// A visit's missions in schedule order.
pub fn sorted_missions<'a>(visit: &'a Value, periods: &PeriodTable) -> Vec<&'a Value> {
    let missions: Vec<&Value> = visit
        .get(MISSIONS)
        .and_then(Value::as_array)
        .map(|missions| missions.iter().filter(|m| m.is_object()).collect())
        .unwrap_or_default();
    order_by_schedule(missions, periods, |mission| date_time_of(mission))
}

pub fn find_visit<'a>(visits: &'a [Value], visit_id: &str) -> Result<&'a Value> {
    visits
        .iter()
        .find(|visit| visit.as_object().is_some_and(|obj| has_id(obj, visit_id)))
        .ok_or_else(|| AgendaError::NotFound {
            kind: "Visit",
            id: visit_id.to_string(),
        })
}

fn find_visit_mut<'a>(visits: &'a mut [Value], visit_id: &str) -> Result<&'a mut Map<String, Value>> {
    visits
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|visit| has_id(visit, visit_id))
        .ok_or_else(|| AgendaError::NotFound {
            kind: "Visit",
            id: visit_id.to_string(),
        })
}

fn parse_priority(value: &str) -> Result<Priority> {
    Priority::parse(value).ok_or_else(|| AgendaError::InvalidPriority(value.to_string()))
}

fn date_time_or_label(value: &str, settings: &Settings) -> String {
    let value = value.trim();
    if value.is_empty() {
        settings.undetermined_label.clone()
    } else {
        value.to_string()
    }
}

fn set_text(obj: &mut Map<String, Value>, key: &str, value: String) -> bool {
    if obj.get(key).and_then(Value::as_str) == Some(value.as_str()) {
        return false;
    }
    obj.insert(key.to_string(), Value::String(value));
    true
}

/// Re-derive `status` from the checklist after an edit.
fn refresh_status(visit: &mut Map<String, Value>) -> bool {
    let Some(derived) = visit
        .get(CHECKLIST)
        .and_then(Value::as_object)
        .map(VisitStatus::from_checklist)
    else {
        return false;
    };
    if visit.get(STATUS).and_then(Value::as_str) == Some(derived.as_str()) {
        return false;
    }
    visit.insert(STATUS.to_string(), json!(derived.as_str()));
    true
}
