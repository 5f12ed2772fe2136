//! Persisted visit list
//!
//! The whole list lives in one pretty-printed JSON array. Every open
//! reconciles it against the current schema and writes the result straight
//! back, so the file on disk is always in the latest layout. Writes go
//! through a temp file and a rename; there is no locking.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{AgendaError, Result};
use crate::reconcile::{reconcile_records, Schema, SCHEMA_VERSION};

pub const DATA_FILE: &str = "visits.json";
pub const META_FILE: &str = "meta.json";

#[derive(Debug)]
pub struct Store {
    dir: PathBuf,
    visits: Vec<Value>,
    upgraded_from: Option<u64>,
}

impl Store {
    /// Load, reconcile and re-persist the visits under `dir`.
    pub fn open(dir: &Path, settings: &Settings) -> Result<Self> {
        let schema = Schema::from_settings(settings);
        let path = dir.join(DATA_FILE);
        let mut upgraded_from = None;
        let raw_visits = match read_visits(&path)? {
            Some(visits) => {
                let meta = load_meta_value(dir)?;
                let stored_version = meta
                    .get("schema_version")
                    .and_then(Value::as_u64)
                    .unwrap_or(1);
                if stored_version < u64::from(SCHEMA_VERSION) {
                    info!(from = stored_version, to = SCHEMA_VERSION, "upgrading visit records");
                    upgraded_from = Some(stored_version);
                }
                visits
            }
            None => {
                info!(path = %path.display(), "starting a new visit list");
                Vec::new()
            }
        };

        let store = Self {
            dir: dir.to_path_buf(),
            visits: reconcile_records(raw_visits, &schema),
            upgraded_from,
        };
        store.save()?;
        Ok(store)
    }

    /// Schema version the file was written with, when this open upgraded it.
    pub fn upgraded_from(&self) -> Option<u64> {
        self.upgraded_from
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    pub fn visits(&self) -> &[Value] {
        &self.visits
    }

    pub fn visits_mut(&mut self) -> &mut Vec<Value> {
        &mut self.visits
    }

    /// Overwrite the visits file with the current list and stamp the meta file.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.data_path(), &Value::Array(self.visits.clone()))?;
        let mut meta = load_meta_value(&self.dir)?;
        if let Some(obj) = meta.as_object_mut() {
            obj.insert("schema_version".to_string(), json!(SCHEMA_VERSION));
        }
        write_json_atomic(&self.dir.join(META_FILE), &meta)?;
        debug!(visits = self.visits.len(), "saved visit list");
        Ok(())
    }
}

/// `None` when the file does not exist yet.
pub fn read_visits(path: &Path) -> Result<Option<Vec<Value>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|err| AgendaError::io(path, err))?;
    let parsed: Value =
        serde_json::from_str(raw.as_str()).map_err(|err| AgendaError::json(path, err))?;
    match parsed {
        Value::Array(items) => Ok(Some(items)),
        _ => Err(AgendaError::Corrupt {
            path: path.to_path_buf(),
        }),
    }
}

fn ensure_meta_shape_value(value: Value) -> Value {
    let mut out = if value.is_object() { value } else { json!({}) };
    if let Some(obj) = out.as_object_mut() {
        if !obj.get("schema_version").is_some_and(Value::is_u64) {
            obj.insert("schema_version".to_string(), json!(1));
        }
    }
    out
}

fn load_meta_value(dir: &Path) -> Result<Value> {
    let path = dir.join(META_FILE);
    if !path.exists() {
        return Ok(ensure_meta_shape_value(json!({})));
    }
    let raw = fs::read_to_string(&path).map_err(|err| AgendaError::io(&path, err))?;
    let parsed = serde_json::from_str::<Value>(raw.as_str()).unwrap_or_else(|_| json!({}));
    Ok(ensure_meta_shape_value(parsed))
}

/// Replace `path` with pretty-printed `value` via a sibling temp file.
pub(crate) fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| AgendaError::io(parent, err))?;
    }
    let temp_path = path.with_extension("json.tmp");
    let mut payload = serde_json::to_string_pretty(value).map_err(|err| AgendaError::json(path, err))?;
    payload.push('\n');
    fs::write(&temp_path, payload).map_err(|err| AgendaError::io(&temp_path, err))?;
    fs::rename(&temp_path, path).map_err(|err| AgendaError::io(path, err))
}
