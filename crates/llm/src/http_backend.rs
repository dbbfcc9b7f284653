use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use super::provider::{
    BackendConfig, BackendResult, BuildClientSnafu, ChatBackend, ChatReply, ChatRequest,
    DecodeReplySnafu, HealthStatus, StatusSnafu, TransportSnafu,
};

/// JSON-over-HTTP chat backend.
pub struct HttpChatBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context(BuildClientSnafu {
            stage: "build-http-client",
        })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_chat(&self, request: ChatRequest) -> BackendResult<ChatReply> {
        let url = self.url(&self.config.chat_path);
        tracing::debug!(url = %url, chat_id = %request.chat_id, "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-chat-request",
                url: url.clone(),
            })?;

        read_json(response, url, "chat").await
    }

    async fn get_health(&self) -> BackendResult<HealthStatus> {
        let url = self.url(&self.config.health_path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-health-request",
                url: url.clone(),
            })?;

        read_json(response, url, "health").await
    }
}

async fn read_json<T>(response: reqwest::Response, url: String, what: &str) -> BackendResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await.context(TransportSnafu {
        stage: "read-response-body",
        url: url.clone(),
    })?;

    if !status.is_success() {
        tracing::warn!(url = %url, status = status.as_u16(), what, "backend rejected request");
        return StatusSnafu {
            stage: "check-response-status",
            url,
            status: status.as_u16(),
            body,
        }
        .fail();
    }

    serde_json::from_str(&body).context(DecodeReplySnafu {
        stage: "decode-response-body",
        url,
        body: body.clone(),
    })
}

impl ChatBackend for HttpChatBackend {
    fn send_chat(&self, request: ChatRequest) -> BoxFuture<'_, BackendResult<ChatReply>> {
        Box::pin(self.post_chat(request))
    }

    fn health(&self) -> BoxFuture<'_, BackendResult<HealthStatus>> {
        Box::pin(self.get_health())
    }
}
