use crate::chat::message::{ConversationId, MessageId, Role};

/// State change published by [`crate::chat::ChatStore`] to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    ConversationCreated {
        conversation_id: ConversationId,
    },
    ConversationSelected {
        conversation_id: ConversationId,
    },
    /// `active_conversation_id` is the active id after the removal.
    ConversationDeleted {
        conversation_id: ConversationId,
        active_conversation_id: Option<ConversationId>,
    },
    MessageAppended {
        conversation_id: ConversationId,
        message_id: MessageId,
        role: Role,
    },
    TitleChanged {
        conversation_id: ConversationId,
        title: String,
    },
    LoadingChanged {
        is_loading: bool,
    },
    ConversationsLoaded {
        count: usize,
    },
}
