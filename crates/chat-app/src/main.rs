use std::sync::Arc;

use ruta::chat::ChatStore;
use ruta::settings::ClientSettings;
use ruta::terminal;
use ruta_llm::create_backend;
use ruta_storage::FileKeyValueStore;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Terminal chat client.
///
/// Loads settings, restores saved conversations, then reads commands and
/// messages from stdin until `/quit` or end of input. Logs go to stderr so
/// they never interleave with replies.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ruta=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = ClientSettings::load();

    let backend = match create_backend(settings.to_backend_config()) {
        Ok(backend) => backend,
        Err(error) => {
            tracing::error!(error = %error, "invalid backend settings");
            std::process::exit(2);
        }
    };
    let storage = Arc::new(FileKeyValueStore::new(&settings.storage_dir));
    let store = ChatStore::new(backend, storage, settings.storage_key.clone());

    if let Err(error) = terminal::restore_session(&store) {
        tracing::error!(error = %error, "failed to restore conversations");
        std::process::exit(1);
    }

    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    if let Err(error) = terminal::run(&store, input, &mut output).await {
        tracing::error!(error = %error, "terminal session failed");
        std::process::exit(1);
    }

    if let Err(error) = store.save_conversations() {
        tracing::error!(error = %error, "failed to save conversations on exit");
        std::process::exit(1);
    }
}
