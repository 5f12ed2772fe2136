//! Visit and mission vocabulary
//!
//! Records stay as `serde_json::Value` objects so fields written by older or
//! newer versions of the tool survive a load/save cycle. The helpers here
//! read them leniently.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

pub const ID: &str = "id";
pub const LOCATION: &str = "location";
pub const DATE_TIME: &str = "date_time";
pub const CHECKLIST: &str = "checklist";
pub const STATUS: &str = "status";
pub const PRIORITY: &str = "priority";
pub const ASSIGNEE: &str = "assignee";
pub const NOTES: &str = "notes";
pub const LAST_UPDATE: &str = "last_update";
pub const MISSIONS: &str = "missions";
pub const TITLE: &str = "title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStatus {
    Pending,
    InProgress,
    Done,
}

impl VisitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VisitStatus::Pending => "Pending",
            VisitStatus::InProgress => "In Progress",
            VisitStatus::Done => "Done",
        }
    }

    /// Done iff every value is truthy, Pending iff none is.
    pub fn from_checklist(checklist: &Map<String, Value>) -> Self {
        if checklist.values().all(is_truthy) {
            VisitStatus::Done
        } else if checklist.values().any(is_truthy) {
            VisitStatus::InProgress
        } else {
            VisitStatus::Pending
        }
    }

    /// Lenient match that also understands the Portuguese labels of older files.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" | "pendente" => Some(VisitStatus::Pending),
            "in progress" | "em andamento" | "andamento" => Some(VisitStatus::InProgress),
            "done" | "concluído" | "concluido" => Some(VisitStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Unset,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Unset => "",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" => Some(Priority::Unset),
            "high" | "alta" => Some(Priority::High),
            "medium" | "média" | "media" => Some(Priority::Medium),
            "low" | "baixa" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionStatus {
    Pending,
    Done,
}

impl MissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MissionStatus::Pending => "Pending",
            MissionStatus::Done => "Done",
        }
    }

    /// Anything that is not a recognized "done" spelling counts as pending.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "done" | "feito" | "concluído" | "concluido" => MissionStatus::Done,
            _ => MissionStatus::Pending,
        }
    }

    pub fn from_done(done: bool) -> Self {
        if done {
            MissionStatus::Done
        } else {
            MissionStatus::Pending
        }
    }
}

/// JSON truthiness: false, null, 0, "" and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub fn nonempty_string(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }
    if let Some(number) = value.as_i64() {
        return Some(number.to_string());
    }
    if let Some(number) = value.as_u64() {
        return Some(number.to_string());
    }
    if let Some(number) = value.as_f64() {
        return Some(number.to_string());
    }
    value.as_bool().map(|flag| flag.to_string())
}

pub fn value_string(value: &Value, key: &str) -> String {
    nonempty_string(value.get(key)).unwrap_or_default()
}

/// Record id as text; numeric ids from older files compare as their digits.
pub fn id_of(value: &Value) -> String {
    value_string(value, ID)
}

pub fn has_id(obj: &Map<String, Value>, id: &str) -> bool {
    nonempty_string(obj.get(ID)).as_deref() == Some(id)
}

pub fn date_time_of(value: &Value) -> &str {
    value.get(DATE_TIME).and_then(Value::as_str).unwrap_or("")
}

/// Status label with a marker, for terminal output.
pub fn status_badge(status: &str) -> String {
    match VisitStatus::parse(status) {
        Some(VisitStatus::Done) => format!("[x] {status}"),
        Some(VisitStatus::InProgress) => format!("[~] {status}"),
        Some(VisitStatus::Pending) => format!("[ ] {status}"),
        None => status.to_string(),
    }
}

pub fn stamp(user: &str, now: NaiveDateTime) -> String {
    format!("By {user} at {}", now.format("%d/%m/%Y %H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn checklist(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn test_status_from_checklist() {
        let all = checklist(json!({"Capture": true, "Product Registration": true, "Account Linking": true}));
        let some = checklist(json!({"Capture": true, "Product Registration": false, "Account Linking": false}));
        let none = checklist(json!({"Capture": false, "Product Registration": false, "Account Linking": false}));
        assert_eq!(VisitStatus::from_checklist(&all), VisitStatus::Done);
        assert_eq!(VisitStatus::from_checklist(&some), VisitStatus::InProgress);
        assert_eq!(VisitStatus::from_checklist(&none), VisitStatus::Pending);
        assert_eq!(VisitStatus::from_checklist(&Map::new()), VisitStatus::Done);
    }

    #[test]
    fn test_legacy_keys_count_toward_status() {
        let legacy = checklist(json!({"Capture": true, "Product Registration": true, "Account Linking": true, "Old Stage": false}));
        assert_eq!(VisitStatus::from_checklist(&legacy), VisitStatus::InProgress);
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!([])));
    }

    #[test]
    fn test_priority_and_mission_status_parsing() {
        assert_eq!(Priority::parse(""), Some(Priority::Unset));
        assert_eq!(Priority::parse("high"), Some(Priority::High));
        assert_eq!(Priority::parse("Média"), Some(Priority::Medium));
        assert_eq!(Priority::parse("urgent"), None);
        assert_eq!(MissionStatus::parse("Feito"), MissionStatus::Done);
        assert_eq!(MissionStatus::parse(" done "), MissionStatus::Done);
        assert_eq!(MissionStatus::parse("whatever"), MissionStatus::Pending);
    }

    #[test]
    fn test_stamp_format() {
        let now = NaiveDate::from_ymd_opt(2026, 1, 13)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .expect("valid datetime");
        assert_eq!(stamp("Neo", now), "By Neo at 13/01/2026 09:05");
        assert_eq!(status_badge("Done"), "[x] Done");
        assert_eq!(status_badge("Custom"), "Custom");
    }
}
