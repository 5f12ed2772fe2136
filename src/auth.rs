//! Credential table gating the board
//!
//! `auth.json` maps user names to PBKDF2-HMAC-SHA256 records. This keeps
//! passwords out of the data directory in clear text; it is not meant to
//! stand up to anyone with access to the files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use crate::config::DEFAULT_PBKDF2_ITERATIONS;
use crate::error::{AgendaError, Result};
use crate::store::write_json_atomic;

pub const AUTH_FILE: &str = "auth.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthRecord {
    pub salt: String,
    pub hash: String,
    #[serde(default = "default_pbkdf2_iterations")]
    pub iterations: u32,
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthFile {
    #[serde(default)]
    users: BTreeMap<String, AuthRecord>,
}

/// Users allowed to act on the board.
#[derive(Debug)]
pub struct Credentials {
    path: PathBuf,
    iterations: u32,
    users: BTreeMap<String, AuthRecord>,
}

impl Credentials {
    pub fn load(dir: &Path, iterations: u32) -> Result<Self> {
        let path = dir.join(AUTH_FILE);
        let mut users = BTreeMap::new();
        if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|err| AgendaError::io(&path, err))?;
            let parsed: AuthFile =
                serde_json::from_str(raw.as_str()).map_err(|err| AgendaError::json(&path, err))?;
            for (name, mut record) in parsed.users {
                if record.salt.is_empty() || record.hash.is_empty() {
                    continue;
                }
                if record.iterations == 0 {
                    record.iterations = DEFAULT_PBKDF2_ITERATIONS;
                }
                users.insert(name, record);
            }
        }
        Ok(Self {
            path,
            iterations: iterations.max(1),
            users,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check `password` for `user`.
    pub fn verify(&self, user: &str, password: &str) -> Result<()> {
        if self.users.is_empty() {
            return Err(AgendaError::NoUsers);
        }
        let Some(record) = self.users.get(user.trim()) else {
            warn!(user, "login attempt for unknown user");
            return Err(AgendaError::Unauthorized);
        };
        if password.is_empty() || !record_matches(record, password) {
            warn!(user, "login rejected");
            return Err(AgendaError::Unauthorized);
        }
        Ok(())
    }

    /// Add (or reset) `name`. Once any user exists, `actor` must authenticate.
    pub fn add_user(&mut self, actor: Option<(&str, &str)>, name: &str, password: &str) -> Result<()> {
        if !self.users.is_empty() {
            let (actor_name, actor_password) = actor.ok_or(AgendaError::Unauthorized)?;
            self.verify(actor_name, actor_password)?;
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(AgendaError::Validation("User name is required.".to_string()));
        }
        if password.is_empty() {
            return Err(AgendaError::Validation("Password is required.".to_string()));
        }
        let record = new_record(password, self.iterations);
        self.users.insert(name.to_string(), record);
        self.save()?;
        info!(user = name, "user added");
        Ok(())
    }

    pub fn change_password(&mut self, user: &str, current: &str, next: &str) -> Result<()> {
        self.verify(user, current)?;
        if next.is_empty() {
            return Err(AgendaError::Validation("Password is required.".to_string()));
        }
        let record = new_record(next, self.iterations);
        self.users.insert(user.trim().to_string(), record);
        self.save()?;
        info!(user, "password changed");
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let file = AuthFile {
            users: self.users.clone(),
        };
        let value = serde_json::to_value(&file).map_err(|err| AgendaError::json(&self.path, err))?;
        write_json_atomic(&self.path, &value)
    }
}

fn new_record(password: &str, iterations: u32) -> AuthRecord {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(password, &salt, iterations);
    AuthRecord {
        salt: encode_b64(&salt),
        hash: encode_b64(key.as_slice()),
        iterations,
    }
}

fn record_matches(record: &AuthRecord, password: &str) -> bool {
    let salt = match decode_b64(record.salt.as_str()) {
        Ok(value) => value,
        Err(_) => return false,
    };
    let key = derive_key(password, salt.as_slice(), record.iterations.max(1));
    encode_b64(key.as_slice()) == record.hash
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn decode_b64(value: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    B64.decode(value)
}

fn encode_b64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}
