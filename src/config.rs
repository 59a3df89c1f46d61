use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::prediction::DEFAULT_PREDICT_URL;

pub const DEFAULT_CONFIG_FILE: &str = "reactions.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub predict_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            predict_url: DEFAULT_PREDICT_URL.into(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Defaults, then `reactions.toml` (or `path`), then environment.
/// A missing default file is fine; a missing explicit file is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(file) {
        Ok(raw) => apply_file(&mut settings, &raw).map_err(|source| ConfigError::Parse {
            path: file.display().to_string(),
            source,
        })?,
        Err(source) if required => {
            return Err(ConfigError::Read {
                path: file.display().to_string(),
                source,
            })
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<(), toml::de::Error> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.bind_addr = v.clone();
    }
    if let Some(v) = file_cfg.get("predict_url") {
        settings.predict_url = v.clone();
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["REACTIONS_BIND_ADDR", "APP__BIND_ADDR"] {
        if let Some(v) = lookup(key) {
            settings.bind_addr = v;
        }
    }
    for key in ["REACTIONS_PREDICT_URL", "APP__PREDICT_URL"] {
        if let Some(v) = lookup(key) {
            settings.predict_url = v;
        }
    }
    for key in ["REACTIONS_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"] {
        if let Some(parsed) = lookup(key).and_then(|v| v.parse::<u64>().ok()) {
            settings.request_timeout_secs = parsed;
        }
    }
}
