use axum::Json;
use ruta_llm::{ChatReply, ChatRequest, HealthStatus};

pub const HEALTH_MESSAGE: &str = "Ruta API is running";

/// Echo reply used until a model is wired in.
pub fn echo_reply(message: &str) -> String {
    format!("You wrote: '{message}'. This is a test reply from the AI!")
}

pub async fn chat(Json(request): Json<ChatRequest>) -> Json<ChatReply> {
    tracing::info!(
        chat_id = %request.chat_id,
        message_chars = request.message.chars().count(),
        "chat request"
    );
    Json(ChatReply {
        response: echo_reply(&request.message),
    })
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        message: HEALTH_MESSAGE.to_string(),
    })
}
