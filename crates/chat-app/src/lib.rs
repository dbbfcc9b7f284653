#![deny(unsafe_code)]

/// Chat client state: conversations, messages and the store that owns them.
pub mod chat;
/// Persistence of the conversation collection in key-value storage.
pub mod database;
/// Client settings, read once at startup.
pub mod settings;
/// Line-oriented terminal front end.
pub mod terminal;

pub use chat::{ChatEvent, ChatState, ChatStore, Conversation, ConversationId, Message, Role};
