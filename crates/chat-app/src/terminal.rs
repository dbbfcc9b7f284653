use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::chat::{ChatStore, ChatStoreResult, ConversationId, LoadOutcome, Message, Role};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List,
    Select(ConversationId),
    Delete(ConversationId),
    Health,
    Help,
    Quit,
    Send(String),
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };

    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };

    match (name, argument) {
        ("new", "") => Command::New,
        ("list", "") => Command::List,
        ("health", "") => Command::Health,
        ("help", "") => Command::Help,
        ("quit" | "exit", "") => Command::Quit,
        ("select", id) if !id.is_empty() => Command::Select(ConversationId::new(id)),
        ("delete", id) if !id.is_empty() => Command::Delete(ConversationId::new(id)),
        _ => Command::Invalid(line.to_string()),
    }
}

const HELP: &str = "commands: /new, /list, /select <id>, /delete <id>, /health, /help, /quit; \
anything else is sent to the active conversation";

#[derive(Debug, Snafu)]
pub enum TerminalError {
    #[snafu(display("terminal I/O failed on `{stage}`: {source}"))]
    Io {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type TerminalResult<T> = Result<T, TerminalError>;

/// Restores saved conversations and leaves one of them active.
///
/// An unreadable blob is moved aside under a sibling key before the session
/// starts, so later saves cannot destroy it.
pub fn restore_session(store: &ChatStore) -> ChatStoreResult<()> {
    match store.load_conversations() {
        LoadOutcome::Loaded { count } if count > 0 => {
            if let Some(first) = store.conversations().first() {
                store.select_conversation(first.id.clone());
            }
            return Ok(());
        }
        LoadOutcome::Rejected => {
            store.set_aside_rejected_conversations()?;
        }
        LoadOutcome::Loaded { .. } | LoadOutcome::Missing => {}
    }

    store.create_conversation();
    Ok(())
}

/// Drives `store` from `input` until end of input or `/quit`, saving after each change.
pub async fn run<R, W>(store: &ChatStore, input: R, output: &mut W) -> TerminalResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context(IoSnafu {
        stage: "read-input-line",
    })? {
        let reply = match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => HELP.to_string(),
            Command::Invalid(line) => format!("unrecognized command: {line}\n{HELP}"),
            Command::New => {
                let conversation = store.create_conversation();
                persist(store);
                format!("created {}", conversation.id)
            }
            Command::List => render_list(store),
            Command::Select(conversation_id) => {
                store.select_conversation(conversation_id.clone());
                match store.active_conversation() {
                    Some(conversation) => format!("selected {}", conversation.title),
                    None => format!("no conversation {conversation_id}"),
                }
            }
            Command::Delete(conversation_id) => {
                if store.delete_conversation(&conversation_id) {
                    persist(store);
                    format!("deleted {conversation_id}")
                } else {
                    format!("no conversation {conversation_id}")
                }
            }
            Command::Health => match store.backend().health().await {
                Ok(health) if health.is_ok() => format!("backend ok: {}", health.message),
                Ok(health) => format!("backend reports {}: {}", health.status, health.message),
                Err(error) => format!("backend unreachable: {error}"),
            },
            Command::Send(content) => send(store, content).await,
        };

        output
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .context(IoSnafu {
                stage: "write-output",
            })?;
        output.flush().await.context(IoSnafu {
            stage: "flush-output",
        })?;
    }

    Ok(())
}

async fn send(store: &ChatStore, content: String) -> String {
    let Some(conversation) = store.active_conversation() else {
        return "no active conversation; use /new first".to_string();
    };
    let seen = conversation.messages.len();

    store.send_message(content).await;
    persist(store);

    let state = store.snapshot();
    let Some(conversation) = state.conversation(&conversation.id) else {
        return "conversation was deleted".to_string();
    };
    conversation
        .messages
        .iter()
        .skip(seen)
        .filter(|message| message.role == Role::Assistant)
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_message(message: &Message) -> String {
    format!("[{}] {}", message.timestamp.format("%H:%M:%S"), message.content)
}

fn render_list(store: &ChatStore) -> String {
    let state = store.snapshot();
    if state.conversations.is_empty() {
        return "no conversations".to_string();
    }

    state
        .conversations
        .iter()
        .map(|conversation| {
            let marker = if state.active_conversation_id.as_ref() == Some(&conversation.id) {
                '*'
            } else {
                ' '
            };
            format!(
                "{marker} {} {} ({} messages, updated {})",
                conversation.id,
                conversation.title,
                conversation.messages.len(),
                conversation.updated_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn persist(store: &ChatStore) {
    if let Err(error) = store.save_conversations() {
        tracing::warn!(error = %error, "failed to save conversations");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ruta_llm::{BackendConfig, create_backend};
    use ruta_server::{ServerSettings, build_router};
    use ruta_storage::{FileKeyValueStore, KeyValueStore};

    use super::*;
    use crate::chat::DEFAULT_CONVERSATION_TITLE;
    use crate::database::DEFAULT_STORAGE_KEY;

    #[test]
    fn parses_commands_and_messages() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("/new"), Command::New);
        assert_eq!(parse_command("/list"), Command::List);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(
            parse_command("/select  abc-1 "),
            Command::Select(ConversationId::new("abc-1"))
        );
        assert_eq!(
            parse_command("/delete abc-1"),
            Command::Delete(ConversationId::new("abc-1"))
        );
        assert_eq!(
            parse_command(" hello there "),
            Command::Send("hello there".to_string())
        );
        assert_eq!(
            parse_command("/select"),
            Command::Invalid("/select".to_string())
        );
        assert_eq!(
            parse_command("/new now"),
            Command::Invalid("/new now".to_string())
        );
    }

    async fn serve_echo_backend() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(&ServerSettings::default());
        tokio::spawn(async move {
            ruta_server::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn session_against_echo_server_persists_to_disk() {
        let base_url = serve_echo_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileKeyValueStore::new(dir.path()));
        let backend = create_backend(BackendConfig::new(base_url)).unwrap();
        let store = ChatStore::new(backend.clone(), storage.clone(), DEFAULT_STORAGE_KEY);

        let input = "/new\nHello\n/health\n/quit\nnever read\n".as_bytes();
        let mut output = Vec::new();
        run(&store, input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("You wrote: 'Hello'. This is a test reply from the AI!"));
        assert!(output.contains("backend ok"));
        assert!(!output.contains("never read"));

        let conversation = store.active_conversation().unwrap();
        assert_eq!(conversation.title, "Hello");
        assert_eq!(conversation.messages.len(), 2);

        assert!(storage.get(DEFAULT_STORAGE_KEY).unwrap().is_some());
        let reloaded = ChatStore::new(backend, storage, DEFAULT_STORAGE_KEY);
        reloaded.load_conversations();
        assert_eq!(reloaded.conversations(), store.conversations());
    }

    #[tokio::test]
    async fn unreadable_history_survives_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileKeyValueStore::new(dir.path()));
        // Two conversations sharing one id, as a same-millisecond collision leaves them.
        let blob = r#"[
            {"id":"1712345678901","title":"Precious history","updatedAt":"2024-04-05T19:34:38.901Z","messages":[]},
            {"id":"1712345678901","title":"Same-ms twin","updatedAt":"2024-04-05T19:34:38.901Z","messages":[]}
        ]"#;
        storage.set(DEFAULT_STORAGE_KEY, blob).unwrap();

        let base_url = serve_echo_backend().await;
        let backend = create_backend(BackendConfig::new(base_url)).unwrap();
        let store = ChatStore::new(backend, storage.clone(), DEFAULT_STORAGE_KEY);

        restore_session(&store).unwrap();
        let mut output = Vec::new();
        run(&store, "/new\nHello\n/quit\n".as_bytes(), &mut output)
            .await
            .unwrap();
        store.save_conversations().unwrap();

        let preserved: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("chat-chats.rejected-"))
            })
            .collect();
        assert_eq!(preserved.len(), 1);
        assert_eq!(std::fs::read_to_string(&preserved[0]).unwrap(), blob);

        let saved = storage.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        assert!(!saved.contains("Precious history"));
        assert_eq!(store.conversations().len(), 2);
    }

    #[test]
    fn restore_selects_first_saved_conversation() {
        let storage = Arc::new(ruta_storage::MemoryKeyValueStore::new());
        let backend = create_backend(BackendConfig::new("http://127.0.0.1:9")).unwrap();
        let earlier = ChatStore::new(backend.clone(), storage.clone(), DEFAULT_STORAGE_KEY);
        earlier.create_conversation();
        let newest = earlier.create_conversation();
        earlier.save_conversations().unwrap();

        let store = ChatStore::new(backend, storage, DEFAULT_STORAGE_KEY);
        restore_session(&store).unwrap();

        assert_eq!(store.conversations().len(), 2);
        assert_eq!(store.active_conversation_id(), Some(newest.id));
    }

    #[tokio::test]
    async fn unreachable_backend_yields_apology() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = create_backend(BackendConfig::new(format!("http://{addr}"))).unwrap();
        let storage = Arc::new(ruta_storage::MemoryKeyValueStore::new());
        let store = ChatStore::new(backend, storage, DEFAULT_STORAGE_KEY);

        let mut output = Vec::new();
        run(&store, "/new\nHello\n/list\n".as_bytes(), &mut output)
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains(crate::chat::APOLOGY_MESSAGE));
        assert!(output.contains("(2 messages"));
        assert!(!store.is_loading());
        assert_ne!(
            store.active_conversation().unwrap().title,
            DEFAULT_CONVERSATION_TITLE
        );
    }
}
