use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";
pub const DEFAULT_HEALTH_PATH: &str = "/api/health";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub chat_path: String,
    pub health_path: String,
    /// No timeout unless set; a hung request then stays pending.
    pub request_timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "chatId")]
    pub chat_id: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            chat_id: chat_id.into(),
        }
    }
}

/// Successful reply of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("invalid backend configuration on `{stage}`: {details}"))]
    InvalidConfig {
        stage: &'static str,
        details: &'static str,
    },
    #[snafu(display("failed to build HTTP client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("backend at {url} returned status {status}: {body}"))]
    Status {
        stage: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to decode reply from {url}: {source}; body: {body}"))]
    DecodeReply {
        stage: &'static str,
        url: String,
        body: String,
        source: serde_json::Error,
    },
}

/// Remote side of a chat exchange: one request, one reply.
pub trait ChatBackend: Send + Sync {
    fn send_chat(&self, request: ChatRequest) -> BoxFuture<'_, BackendResult<ChatReply>>;
    fn health(&self) -> BoxFuture<'_, BackendResult<HealthStatus>>;
}
