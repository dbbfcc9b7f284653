use ruta_server::{ServerSettings, bind, build_router, serve};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ruta_server=info,tower_http=info")),
        )
        .init();

    let settings = ServerSettings::load();
    let router = build_router(&settings);

    let listener = match bind(&settings.bind_address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(error = %error, "failed to start server");
            std::process::exit(1);
        }
    };
    tracing::info!(
        address = %settings.bind_address,
        origins = ?settings.allowed_origins,
        "chat server listening"
    );

    if let Err(error) = serve(listener, router).await {
        tracing::error!(error = %error, "server terminated");
        std::process::exit(1);
    }
}
