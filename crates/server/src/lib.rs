#![deny(unsafe_code)]

/// Route handlers for the chat and health endpoints.
pub mod handlers;
/// Server settings, read once at startup.
pub mod settings;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use snafu::{ResultExt, Snafu};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use settings::ServerSettings;

#[derive(Debug, Snafu)]
pub enum ServerError {
    #[snafu(display("failed to bind {address} on `{stage}`: {source}"))]
    Bind {
        stage: &'static str,
        address: String,
        source: std::io::Error,
    },
    #[snafu(display("server stopped on `{stage}`: {source}"))]
    Serve {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Builds the API router with CORS limited to `settings.allowed_origins`.
pub fn build_router(settings: &ServerSettings) -> Router {
    let origins = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(origin = %origin, error = %error, "ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn bind(address: &str) -> ServerResult<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(address)
        .await
        .context(BindSnafu {
            stage: "bind-listener",
            address,
        })
}

pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> ServerResult<()> {
    axum::serve(listener, router).await.context(ServeSnafu {
        stage: "serve-http",
    })
}
