use std::fs;

use serde_json::{json, Value};
use tempfile::tempdir;

use visit_agenda::board::{self, MissionPatch, NewVisit};
use visit_agenda::config::Settings;
use visit_agenda::reconcile::{reconcile_records, Schema};
use visit_agenda::schedule::schedule_order;
use visit_agenda::store::{read_visits, Store, DATA_FILE};

const STAMP: &str = "By Frodo at 14/01/2026 17:45";

#[test]
fn test_store_round_trip_after_board_edits() {
    let dir = tempdir().expect("tempdir");
    let settings = Settings::default();
    let mut store = Store::open(dir.path(), &settings).expect("open");

    let granja = board::add_visit(
        store.visits_mut(),
        &settings,
        NewVisit {
            location: "Granja".to_string(),
            date_time: "15/01/2026 - Durante o dia".to_string(),
            priority: "Medium".to_string(),
            assignee: "Frodo".to_string(),
        },
        STAMP,
    )
    .expect("add granja");
    board::set_stage(store.visits_mut(), &settings, &granja, "Capture", true, STAMP).expect("check");
    let mission = board::add_mission(store.visits_mut(), &settings, &granja, "Present the system", "", STAMP)
        .expect("mission");
    board::update_mission(
        store.visits_mut(),
        &settings,
        &granja,
        &mission,
        MissionPatch {
            done: Some(true),
            ..MissionPatch::default()
        },
        STAMP,
    )
    .expect("done");
    store.save().expect("save");

    let reopened = Store::open(dir.path(), &settings).expect("reopen");
    assert_eq!(reopened.visits(), store.visits());

    let visit = &reopened.visits()[0];
    assert_eq!(visit["status"], "In Progress");
    assert_eq!(visit["priority"], "Medium");
    assert_eq!(visit["missions"][0]["status"], "Done");
    assert_eq!(visit["missions"][0]["date_time"], "A Definir");
}

#[test]
fn test_open_upgrades_an_older_file_without_losing_data() {
    let dir = tempdir().expect("tempdir");
    let legacy = json!([
        {
            "id": "robson",
            "location": "Róbson",
            "date_time": "13/01/2026 - Manhã",
            "checklist": {"Capture": true, "Cadastro Produtos": true},
            "status": "Pendente",
            "responsavel": "Neo"
        },
        {"location": "Adelson dos Salgados", "date_time": "16/01/2026 - 07:30"},
        17,
        {"location": "Teresinha", "date_time": "A Definir", "missions": [{"titulo": "Atualizar preços"}]}
    ]);
    fs::write(
        dir.path().join(DATA_FILE),
        serde_json::to_string_pretty(&legacy).expect("encode"),
    )
    .expect("seed");

    let settings = Settings::default();
    let store = Store::open(dir.path(), &settings).expect("open");
    let visits = store.visits();
    assert_eq!(visits.len(), 4);

    let robson = &visits[0];
    assert_eq!(robson["id"], "robson");
    assert_eq!(robson["status"], "Pendente");
    assert_eq!(robson["responsavel"], "Neo");
    assert_eq!(robson["checklist"]["Cadastro Produtos"], true);
    assert_eq!(robson["checklist"]["Capture"], true);
    assert_eq!(robson["checklist"]["Account Linking"], false);

    assert_eq!(visits[1]["status"], "Pending");
    assert_eq!(visits[2], json!(17));
    assert_eq!(visits[3]["missions"][0]["titulo"], "Atualizar preços");
    assert_eq!(visits[3]["missions"][0]["title"], "");

    let on_disk = read_visits(&store.data_path()).expect("read").expect("exists");
    assert_eq!(on_disk, visits);

    let again = reconcile_records(on_disk, &Schema::from_settings(&settings));
    assert_eq!(again, visits);
}

#[test]
fn test_checklist_values_never_flip_to_false() {
    let settings = Settings::default();
    let input = vec![
        json!({"checklist": {"Capture": true, "Product Registration": true}}),
        json!({"checklist": {"Account Linking": true, "Legacy": true}}),
    ];
    let out = reconcile_records(input.clone(), &Schema::from_settings(&settings));
    for (before, after) in input.iter().zip(&out) {
        let before = before["checklist"].as_object().expect("checklist");
        let after = after["checklist"].as_object().expect("checklist");
        for (stage, value) in before {
            assert_eq!(after.get(stage), Some(value));
        }
        for stage in &settings.stages {
            assert!(after.contains_key(stage.as_str()));
        }
    }
}

#[test]
fn test_board_order_matches_descriptor_order() {
    let settings = Settings::default();
    let periods = settings.period_table().expect("periods");
    let descriptors = ["A Definir", "13/01/2026 - Manhã", "16/01/2026 - 07:30", "", "not-a-date"];
    assert_eq!(schedule_order(descriptors, &periods), vec![1, 2, 4, 0, 3]);

    let visits: Vec<Value> = descriptors
        .iter()
        .enumerate()
        .map(|(i, date_time)| json!({"id": format!("v{i}"), "location": format!("Place {i}"), "date_time": date_time}))
        .collect();
    let rows = board::visit_overview(&visits, &periods);
    let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "v2", "v4", "v0", "v3"]);
}
