use std::path::{Path, PathBuf};
use std::time::Duration;

use ruta_llm::{BackendConfig, DEFAULT_BASE_URL, DEFAULT_CHAT_PATH, DEFAULT_HEALTH_PATH};
use ruta_storage::load_json_settings;
use serde::{Deserialize, Serialize};

use crate::database::DEFAULT_STORAGE_KEY;

pub const SETTINGS_DIRECTORY_NAME: &str = "ruta";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Unset means requests may wait forever.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            health_path: default_health_path(),
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
            request_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn to_backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(&self.base_url);
        config.chat_path = self.chat_path.clone();
        config.health_path = self.health_path.clone();
        if let Some(seconds) = self.request_timeout_secs.filter(|seconds| *seconds > 0) {
            config = config.with_request_timeout(Duration::from_secs(seconds));
        }
        config
    }

    pub fn normalized(mut self) -> Self {
        self.base_url = non_blank_or(self.base_url, default_base_url)
            .trim_end_matches('/')
            .to_string();
        self.chat_path = normalize_path(non_blank_or(self.chat_path, default_chat_path));
        self.health_path = normalize_path(non_blank_or(self.health_path, default_health_path));
        self.storage_key = non_blank_or(self.storage_key, default_storage_key);
        if self.storage_dir.as_os_str().is_empty() {
            self.storage_dir = default_storage_dir();
        }
        self
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".ruta"))
            .join(SETTINGS_FILE_NAME)
    }

    /// Reads `<config_dir>/ruta/settings.json`.
    pub fn load() -> Self {
        Self::load_from(&Self::default_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        load_json_settings::<Self>(path).normalized()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".ruta"))
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}
