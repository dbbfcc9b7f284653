use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title every conversation starts with until its first message names it.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New chat";
/// Number of characters of the first message kept as the title.
pub const TITLE_MAX_CHARS: usize = 30;
pub const TITLE_ELLIPSIS: &str = "...";

// Ids are opaque strings so blobs written with older id schemes still load.
macro_rules! define_chat_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Mints a time-ordered id that stays unique within one millisecond.
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

define_chat_id!(ConversationId);
define_chat_id!(MessageId);

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation. Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Titled, chronologically ordered message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation with the placeholder title.
    pub fn new() -> Self {
        Self {
            id: ConversationId::generate(),
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            updated_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title == DEFAULT_CONVERSATION_TITLE
    }

    /// Appends `message` and, when `touch` is set, moves `updated_at` to its timestamp.
    pub fn append(&mut self, message: Message, touch: bool) {
        if touch {
            self.updated_at = message.timestamp;
        }
        self.messages.push(message);
    }

    /// Names the conversation after `content` once; custom titles are left alone.
    pub fn adopt_title_from(&mut self, content: &str) -> bool {
        if !self.has_placeholder_title() {
            return false;
        }
        self.title = derive_title(content);
        true
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// First [`TITLE_MAX_CHARS`] characters of `content`, with an ellipsis when cut.
pub fn derive_title(content: &str) -> String {
    let mut characters = content.chars();
    let mut title: String = characters.by_ref().take(TITLE_MAX_CHARS).collect();
    if characters.next().is_some() {
        title.push_str(TITLE_ELLIPSIS);
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_becomes_title_verbatim() {
        assert_eq!(derive_title("Hello"), "Hello");
        assert_eq!(derive_title(""), "");
    }

    #[test]
    fn exactly_thirty_characters_is_not_truncated() {
        let content = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&content), content);
    }

    #[test]
    fn long_content_is_cut_at_thirty_characters() {
        let content = "The quick brown fox jumps over the lazy dog";
        assert_eq!(derive_title(content), "The quick brown fox jumps over...");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "привет ".repeat(10);
        let title = derive_title(&content);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + TITLE_ELLIPSIS.len());
        assert!(title.ends_with(TITLE_ELLIPSIS));
    }

    #[test]
    fn custom_title_is_never_replaced() {
        let mut conversation = Conversation::new();
        conversation.title = "Trip planning".to_string();

        assert!(!conversation.adopt_title_from("Hello"));
        assert_eq!(conversation.title, "Trip planning");
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = ConversationId::generate();
        let second = ConversationId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn conversation_serializes_with_camel_case_fields() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("hi"), true);

        let json = serde_json::to_value(&conversation).unwrap();
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["messages"][0].get("timestamp").is_some());
    }
}
