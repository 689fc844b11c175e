use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const SETTINGS_FILE: &str = "tasks.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub page_size: u32,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub credentials_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credentials_path: None,
        }
    }
}

impl ClientSettings {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Where the access token is kept between runs.
    pub fn resolve_credentials_path(&self) -> ClientResult<PathBuf> {
        if let Some(path) = &self.credentials_path {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join("tasks").join("credentials"))
            .ok_or_else(|| {
                ClientError::Settings(
                    "no config directory available; set APP__CREDENTIALS_PATH".into(),
                )
            })
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.page_size == 0 {
            return Err(ClientError::Settings("page_size must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Settings(
                "request_timeout_secs must be positive".into(),
            ));
        }
        url::Url::parse(&self.api_url)
            .map_err(|err| ClientError::Settings(format!("api_url '{}': {err}", self.api_url)))?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    page_size: Option<u32>,
    search_debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    credentials_path: Option<PathBuf>,
}

/// Defaults, then `tasks.toml` in the working directory, then environment overrides.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    apply_file(&mut settings, Path::new(SETTINGS_FILE));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut ClientSettings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    match toml::from_str::<FileSettings>(&raw) {
        Ok(file_cfg) => {
            debug!(path = %path.display(), "loaded client settings file");
            merge_file_settings(settings, file_cfg);
        }
        Err(err) => warn!(path = %path.display(), "ignoring unreadable settings file: {err}"),
    }
}

fn merge_file_settings(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.search_debounce_ms {
        settings.search_debounce_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.credentials_path {
        settings.credentials_path = Some(v);
    }
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("TASKS_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("APP__PAGE_SIZE") {
        match v.parse::<u32>() {
            Ok(parsed) if parsed > 0 => settings.page_size = parsed,
            _ => warn!("ignoring APP__PAGE_SIZE={v}: expected a positive integer"),
        }
    }

    if let Some(v) = var("APP__SEARCH_DEBOUNCE_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.search_debounce_ms = parsed,
            Err(_) => warn!("ignoring APP__SEARCH_DEBOUNCE_MS={v}: expected milliseconds"),
        }
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.request_timeout_secs = parsed,
            _ => warn!("ignoring APP__REQUEST_TIMEOUT_SECS={v}: expected a positive integer"),
        }
    }

    if let Some(v) = var("APP__CREDENTIALS_PATH") {
        settings.credentials_path = Some(PathBuf::from(v));
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
