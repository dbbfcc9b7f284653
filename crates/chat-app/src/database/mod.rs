mod conversation;

pub use conversation::{
    ConversationStore, ConversationStoreError, ConversationStoreResult, DEFAULT_STORAGE_KEY,
};
