//! Engine configuration, built once at startup and passed to
//! [`crate::engine::SegmentEngine::new`].
//!
//! Sources, lowest priority first: defaults, `config.json`, `config.0.json`
//! (both optional, keys overlaid shallowly), then the environment.

use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::errors::SegmentGraphError;

pub const CONFIG_FILES: [&str; 2] = ["config.json", "config.0.json"];
pub const DEFAULT_GET_TOKEN: &str = "example_token";

/// Whether the backend exposes the server-side resolution procedures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureMode {
    #[default]
    Enabled,
    Disabled,
}

impl ProcedureMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enabled" | "on" | "true" | "1" => Some(ProcedureMode::Enabled),
            "disabled" | "off" | "false" | "0" => Some(ProcedureMode::Disabled),
            _ => None,
        }
    }

    pub fn is_enabled(self) -> bool {
        self == ProcedureMode::Enabled
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// `memory` or a SQLite file path.
    pub database: String,
    pub procedures: ProcedureMode,
    /// Read token; `None` or an empty string disables the check.
    pub get_token: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: String::from("memory"),
            procedures: ProcedureMode::Enabled,
            get_token: Some(DEFAULT_GET_TOKEN.to_string()),
        }
    }
}

impl EngineConfig {
    pub fn with_database<T: Into<String>>(mut self, database: T) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_procedures(mut self, procedures: ProcedureMode) -> Self {
        self.procedures = procedures;
        self
    }

    pub fn with_get_token(mut self, token: Option<String>) -> Self {
        self.get_token = token;
        self
    }

    /// Defaults overlaid with the config files in `dir` and the process environment.
    pub fn load(dir: &Path) -> Self {
        Self::default()
            .overlay_files(dir)
            .overlay_env(|key| env::var(key).ok())
    }

    /// Applies `config.json` then `config.0.json` from `dir`, key by key.
    /// Missing files are skipped silently, unreadable ones with a warning; a
    /// key with an unusable value is skipped without touching the others.
    pub fn overlay_files(mut self, dir: &Path) -> Self {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if !path.exists() {
                continue;
            }
            match read_object(&path) {
                Ok(object) => {
                    for (key, value) in object {
                        if let Err(err) = self.apply_key(&key, value) {
                            warn!(
                                path = %path.display(),
                                key = %key,
                                error = %err,
                                "skipping config value"
                            );
                        }
                    }
                }
                Err(err) => warn!(path = %path.display(), error = %err, "skipping config file"),
            }
        }
        info!(database = %self.database, procedures = ?self.procedures, "configuration loaded");
        self
    }

    fn apply_key(&mut self, key: &str, value: Value) -> Result<(), SegmentGraphError> {
        match key {
            "database" => self.database = typed(value)?,
            "procedures" => self.procedures = typed(value)?,
            "get_token" => self.get_token = Some(typed(value)?),
            _ => {}
        }
        Ok(())
    }

    /// Applies `GET_TOKEN`, `SEGMENTGRAPH_DB` and `SEGMENTGRAPH_PROCEDURES`.
    pub fn overlay_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GET_TOKEN") {
            self.get_token = Some(token);
        }
        if let Some(database) = lookup("SEGMENTGRAPH_DB") {
            self.database = database;
        }
        if let Some(raw) = lookup("SEGMENTGRAPH_PROCEDURES") {
            match ProcedureMode::parse(&raw) {
                Some(mode) => self.procedures = mode,
                None => warn!(value = %raw, "unrecognized SEGMENTGRAPH_PROCEDURES value"),
            }
        }
        self
    }

    pub fn token_required(&self) -> bool {
        self.get_token.as_deref().is_some_and(|token| !token.is_empty())
    }

    pub fn verify_token(&self, presented: Option<&str>) -> bool {
        match self.get_token.as_deref() {
            Some(expected) if !expected.is_empty() => presented.unwrap_or("") == expected,
            _ => true,
        }
    }
}

fn typed<T: DeserializeOwned>(value: Value) -> Result<T, SegmentGraphError> {
    serde_json::from_value(value).map_err(|e| SegmentGraphError::config(e.to_string()))
}

fn read_object(path: &Path) -> Result<Map<String, Value>, SegmentGraphError> {
    let text = fs::read_to_string(path).map_err(|e| SegmentGraphError::config(e.to_string()))?;
    match serde_json::from_str(&text).map_err(|e| SegmentGraphError::config(e.to_string()))? {
        Value::Object(object) => Ok(object),
        _ => Err(SegmentGraphError::config("config file must hold a JSON object")),
    }
}
