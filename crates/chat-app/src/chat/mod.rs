/// Event contracts for store subscribers.
pub mod events;
/// Domain entities: conversations, messages and their ids.
pub mod message;
pub mod store;

pub use events::ChatEvent;
pub use message::{
    Conversation, ConversationId, DEFAULT_CONVERSATION_TITLE, Message, MessageId, Role,
    derive_title,
};
pub use store::{
    APOLOGY_MESSAGE, ChatState, ChatStore, ChatStoreError, ChatStoreResult, LoadOutcome,
};
