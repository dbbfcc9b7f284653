mod http_backend;
mod provider;

pub use http_backend::HttpChatBackend;
pub use provider::{
    BackendConfig, BackendError, BackendResult, ChatBackend, ChatReply, ChatRequest,
    DEFAULT_BASE_URL, DEFAULT_CHAT_PATH, DEFAULT_HEALTH_PATH, HealthStatus,
};

use std::sync::Arc;

use snafu::ensure;

use provider::InvalidConfigSnafu;

/// Validates `config` and builds the HTTP backend for it.
pub fn create_backend(mut config: BackendConfig) -> BackendResult<Arc<dyn ChatBackend>> {
    config.base_url = config.base_url.trim().trim_end_matches('/').to_string();
    ensure!(
        !config.base_url.is_empty(),
        InvalidConfigSnafu {
            stage: "create-backend",
            details: "base URL must not be empty",
        }
    );
    ensure!(
        config.chat_path.starts_with('/') && config.health_path.starts_with('/'),
        InvalidConfigSnafu {
            stage: "create-backend",
            details: "endpoint paths must start with '/'",
        }
    );

    Ok(Arc::new(HttpChatBackend::new(config)?))
}
