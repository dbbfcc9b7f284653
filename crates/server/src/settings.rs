use std::path::{Path, PathBuf};

use ruta_storage::load_json_settings;
use serde::{Deserialize, Serialize};

pub const SETTINGS_DIRECTORY_NAME: &str = "ruta";
pub const SERVER_SETTINGS_FILE_NAME: &str = "server.json";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ServerSettings {
    pub fn normalized(mut self) -> Self {
        self.bind_address = self.bind_address.trim().to_string();
        if self.bind_address.is_empty() {
            self.bind_address = default_bind_address();
        }
        self.allowed_origins = self
            .allowed_origins
            .into_iter()
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        self
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".ruta"))
            .join(SERVER_SETTINGS_FILE_NAME)
    }

    /// Reads `<config_dir>/ruta/server.json`.
    pub fn load() -> Self {
        Self::load_from(&Self::default_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        load_json_settings::<Self>(path).normalized()
    }
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_allowed_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS
        .iter()
        .map(|origin| origin.to_string())
        .collect()
}
