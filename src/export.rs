//! CSV export of the agenda
//!
//! Rows come out in schedule order. Cells that a spreadsheet would read as a
//! formula get a leading apostrophe.

use serde_json::Value;

use crate::config::Settings;
use crate::error::Result;
use crate::model::{date_time_of, is_truthy, value_string, ASSIGNEE, CHECKLIST, LOCATION, NOTES, PRIORITY, STATUS};
use crate::schedule::order_by_schedule;

pub const AGENDA_COLUMNS: [&str; 7] = [
    "Location",
    "Date/Time",
    "Checklist",
    "Priority",
    "Assignee",
    "Status",
    "Notes",
];

/// Render every visit as one CSV row under [`AGENDA_COLUMNS`].
pub fn agenda_csv(visits: &[Value], settings: &Settings) -> Result<String> {
    let periods = settings.period_table()?;
    let rows: Vec<[String; 7]> = visits
        .iter()
        .filter(|visit| visit.is_object())
        .map(|visit| {
            [
                value_string(visit, LOCATION),
                date_time_of(visit).to_string(),
                pending_stages(visit, settings).join("\n"),
                value_string(visit, PRIORITY),
                value_string(visit, ASSIGNEE),
                value_string(visit, STATUS),
                value_string(visit, NOTES),
            ]
        })
        .collect();
    let rows = order_by_schedule(rows, &periods, |row| row[1].as_str());

    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_line(AGENDA_COLUMNS.iter().copied()));
    for row in &rows {
        lines.push(csv_line(row.iter().map(String::as_str)));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// Canonical stages of `visit` that are not done yet, in configured order.
fn pending_stages<'a>(visit: &Value, settings: &'a Settings) -> Vec<&'a str> {
    let checklist = visit.get(CHECKLIST).and_then(Value::as_object);
    settings
        .stages
        .iter()
        .filter(|stage| {
            !checklist
                .and_then(|checklist| checklist.get(stage.as_str()))
                .is_some_and(is_truthy)
        })
        .map(String::as_str)
        .collect()
}

fn csv_line<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(csv_escape).collect::<Vec<_>>().join(",")
}

fn should_neutralize_csv(value: &str) -> bool {
    let trimmed = value.trim_start_matches(' ');
    if trimmed.is_empty() || trimmed.starts_with('\'') {
        return false;
    }
    matches!(
        trimmed.chars().next(),
        Some('=') | Some('+') | Some('-') | Some('@') | Some('\t') | Some('\r')
    )
}

fn neutralize_csv_formula(value: &str) -> String {
    if should_neutralize_csv(value) {
        format!("'{value}")
    } else {
        value.to_string()
    }
}

fn csv_escape(value: &str) -> String {
    let safe = neutralize_csv_formula(value);
    if safe.contains(',') || safe.contains('"') || safe.contains('\n') || safe.contains('\r') {
        format!("\"{}\"", safe.replace('"', "\"\""))
    } else {
        safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_and_neutralize() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("=SUM(A1)"), "'=SUM(A1)");
        assert_eq!(csv_escape("'=already"), "'=already");
        assert_eq!(csv_escape("-5"), "'-5");
        assert_eq!(csv_escape(""), "");
    }

    #[test]
    fn test_agenda_rows_in_schedule_order() {
        let visits = vec![
            json!({"location": "Valéria do Nunes", "date_time": "A Definir", "checklist": {"Capture": true}, "status": "In Progress"}),
            json!({"location": "Adelson dos Salgados", "date_time": "16/01/2026 - 07:30", "checklist": {}, "priority": "High", "status": "Pending"}),
            json!("stray"),
            json!({"location": "Róbson", "date_time": "13/01/2026 - Manhã", "checklist": {"Capture": true, "Product Registration": true, "Account Linking": true}, "status": "Done", "notes": "=1+1"}),
        ];
        let csv = agenda_csv(&visits, &Settings::default()).expect("csv");
        let expected = "Location,Date/Time,Checklist,Priority,Assignee,Status,Notes\n\
            Róbson,13/01/2026 - Manhã,,,,Done,'=1+1\n\
            Adelson dos Salgados,16/01/2026 - 07:30,\"Capture\nProduct Registration\nAccount Linking\",High,,Pending,\n\
            Valéria do Nunes,A Definir,\"Product Registration\nAccount Linking\",,,In Progress,\n";
        assert_eq!(csv, expected);
    }
}
