//! Schema reconciliation for persisted visits
//!
//! One additive migration: every visit and mission ends up with an id and
//! every current field, while values already present (including fields this
//! version does not know about) are left untouched. Non-object entries pass
//! through as they are.

use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::config::Settings;
use crate::model::{
    is_truthy, MissionStatus, VisitStatus, ASSIGNEE, CHECKLIST, DATE_TIME, ID, LAST_UPDATE,
    LOCATION, MISSIONS, NOTES, PRIORITY, STATUS, TITLE,
};

/// Version of the record layout produced by [`reconcile`].
///
/// 1: location/date/checklist/status/priority/assignee/notes/last_update.
/// 2: adds `missions`.
pub const SCHEMA_VERSION: u32 = 2;

/// The parts of the configuration the reconciler fills records from.
#[derive(Debug, Clone)]
pub struct Schema {
    pub stages: Vec<String>,
    pub undetermined_label: String,
}

impl Schema {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            stages: settings.stages.clone(),
            undetermined_label: settings.undetermined_label.clone(),
        }
    }

    /// Every canonical stage, not done.
    pub fn empty_checklist(&self) -> Value {
        let checklist: Map<String, Value> = self
            .stages
            .iter()
            .map(|stage| (stage.clone(), Value::Bool(false)))
            .collect();
        Value::Object(checklist)
    }
}

/// Normalize `records` to the current schema using random v4 ids.
pub fn reconcile_records(records: Vec<Value>, schema: &Schema) -> Vec<Value> {
    reconcile(records, schema, &mut || Uuid::new_v4().to_string())
}

/// Normalize `records`, drawing fresh identifiers from `new_id`.
pub fn reconcile<F>(records: Vec<Value>, schema: &Schema, new_id: &mut F) -> Vec<Value>
where
    F: FnMut() -> String,
{
    let mut skipped = 0usize;
    let out: Vec<Value> = records
        .into_iter()
        .enumerate()
        .map(|(index, mut record)| {
            match record.as_object_mut() {
                Some(visit) => reconcile_visit(visit, index, schema, new_id),
                None => skipped += 1,
            }
            record
        })
        .collect();
    debug!(records = out.len(), skipped, "reconciled visits");
    out
}

fn reconcile_visit<F>(visit: &mut Map<String, Value>, index: usize, schema: &Schema, new_id: &mut F)
where
    F: FnMut() -> String,
{
    ensure_id(visit, new_id);

    if !visit.get(CHECKLIST).is_some_and(Value::is_object) {
        visit.insert(CHECKLIST.to_string(), schema.empty_checklist());
    }
    if let Some(checklist) = visit.get_mut(CHECKLIST).and_then(Value::as_object_mut) {
        for stage in &schema.stages {
            if !checklist.contains_key(stage) {
                checklist.insert(stage.clone(), Value::Bool(false));
            }
        }
    }
    let derived = visit
        .get(CHECKLIST)
        .and_then(Value::as_object)
        .map(VisitStatus::from_checklist)
        .unwrap_or(VisitStatus::Pending);

    set_default(visit, LOCATION, json!(format!("Establishment {}", index + 1)));
    set_default(visit, DATE_TIME, json!(schema.undetermined_label));
    set_default(visit, STATUS, json!(derived.as_str()));
    set_default(visit, PRIORITY, json!(""));
    set_default(visit, ASSIGNEE, json!(""));
    set_default(visit, NOTES, json!(""));
    set_default(visit, LAST_UPDATE, json!(""));

    if !visit.get(MISSIONS).is_some_and(Value::is_array) {
        visit.insert(MISSIONS.to_string(), json!([]));
    }
    if let Some(missions) = visit.get_mut(MISSIONS).and_then(Value::as_array_mut) {
        for mission in missions.iter_mut().filter_map(Value::as_object_mut) {
            ensure_id(mission, new_id);
            set_default(mission, TITLE, json!(""));
            set_default(mission, DATE_TIME, json!(schema.undetermined_label));
            set_default(mission, STATUS, json!(MissionStatus::Pending.as_str()));
            set_default(mission, NOTES, json!(""));
            set_default(mission, LAST_UPDATE, json!(""));
        }
    }
}

fn ensure_id<F>(obj: &mut Map<String, Value>, new_id: &mut F)
where
    F: FnMut() -> String,
{
    if !obj.get(ID).is_some_and(is_truthy) {
        obj.insert(ID.to_string(), Value::String(new_id()));
    }
}

fn set_default(obj: &mut Map<String, Value>, key: &str, value: Value) {
    if !obj.contains_key(key) {
        obj.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_settings(&Settings::default())
    }

    fn counter() -> impl FnMut() -> String {
        let mut next = 0;
        move || {
            next += 1;
            format!("id-{next}")
        }
    }

    #[test]
    fn test_fills_a_bare_record() {
        let out = reconcile(vec![json!({"location": "Granja"})], &schema(), &mut counter());
        assert_eq!(
            out[0],
            json!({
                "location": "Granja",
                "id": "id-1",
                "checklist": {"Capture": false, "Product Registration": false, "Account Linking": false},
                "date_time": "A Definir",
                "status": "Pending",
                "priority": "",
                "assignee": "",
                "notes": "",
                "last_update": "",
                "missions": [],
            })
        );
    }

    #[test]
    fn test_is_idempotent() {
        let input = vec![
            json!({"location": "Róbson", "checklist": {"Capture": true}}),
            json!({"id": "", "missions": [{"title": "Call back"}, 3]}),
            json!("garbage"),
        ];
        let once = reconcile_records(input, &schema());
        let twice = reconcile_records(once.clone(), &schema());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_assigns_ids_once_and_keeps_them() {
        let input = vec![
            json!({"id": "keep-me"}),
            json!({"id": null}),
            json!({"id": 0}),
            json!({}),
        ];
        let out = reconcile(input, &schema(), &mut counter());
        let ids: Vec<String> = out.iter().map(crate::model::id_of).collect();
        assert_eq!(ids, vec!["keep-me", "id-1", "id-2", "id-3"]);

        let again = reconcile(out.clone(), &schema(), &mut counter());
        assert_eq!(again, out);
    }

    #[test]
    fn test_random_ids_are_distinct() {
        let out = reconcile_records(vec![json!({}), json!({})], &schema());
        assert_ne!(crate::model::id_of(&out[0]), crate::model::id_of(&out[1]));
        assert!(!crate::model::id_of(&out[0]).is_empty());
    }

    #[test]
    fn test_checklist_is_additive() {
        let input = vec![json!({"checklist": {"Capture": true, "Legacy Step": true}})];
        let out = reconcile(input, &schema(), &mut counter());
        assert_eq!(
            out[0]["checklist"],
            json!({"Capture": true, "Legacy Step": true, "Product Registration": false, "Account Linking": false})
        );
        assert_eq!(out[0]["status"], "In Progress");
    }

    #[test]
    fn test_wrong_typed_checklist_is_replaced() {
        let out = reconcile(vec![json!({"checklist": ["Capture"]})], &schema(), &mut counter());
        assert_eq!(out[0]["checklist"], schema().empty_checklist());
        assert_eq!(out[0]["status"], "Pending");
    }

    #[test]
    fn test_existing_values_are_not_overwritten() {
        let input = vec![json!({
            "id": "v1",
            "checklist": {"Capture": true, "Product Registration": true, "Account Linking": true},
            "status": "Pending",
            "priority": "High",
            "notes": null,
            "extra": {"kept": true},
        })];
        let out = reconcile(input, &schema(), &mut counter());
        assert_eq!(out[0]["status"], "Pending");
        assert_eq!(out[0]["priority"], "High");
        assert_eq!(out[0]["notes"], Value::Null);
        assert_eq!(out[0]["extra"], json!({"kept": true}));
    }

    #[test]
    fn test_derived_status_done() {
        let input = vec![json!({"checklist": {"Capture": true, "Product Registration": true, "Account Linking": true}})];
        let out = reconcile(input, &schema(), &mut counter());
        assert_eq!(out[0]["status"], "Done");
    }

    #[test]
    fn test_non_objects_pass_through_and_keep_positions() {
        let input = vec![json!(42), json!({}), json!(null)];
        let out = reconcile(input, &schema(), &mut counter());
        assert_eq!(out[0], json!(42));
        assert_eq!(out[1]["location"], "Establishment 2");
        assert_eq!(out[2], Value::Null);
    }

    #[test]
    fn test_missions_are_normalized() {
        let input = vec![
            json!({"missions": "nope"}),
            json!({"missions": [{"title": "Show catalog", "status": "Feito"}, "loose", {"id": "m9"}]}),
        ];
        let out = reconcile(input, &schema(), &mut counter());
        assert_eq!(out[0]["missions"], json!([]));

        let missions = out[1]["missions"].as_array().expect("missions");
        assert_eq!(missions.len(), 3);
        assert_eq!(missions[0]["status"], "Feito");
        assert_eq!(missions[0]["date_time"], "A Definir");
        assert!(!missions[0]["id"].as_str().unwrap_or("").is_empty());
        assert_eq!(missions[1], json!("loose"));
        assert_eq!(missions[2]["id"], "m9");
        assert_eq!(missions[2]["status"], "Pending");
        assert_eq!(missions[2]["title"], "");
    }
}
