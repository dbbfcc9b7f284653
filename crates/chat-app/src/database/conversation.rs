use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use ruta_storage::{KeyValueStore, StorageError};
use snafu::{ResultExt, Snafu};

use crate::chat::Conversation;

/// Storage key the browser client used for its conversation list.
pub const DEFAULT_STORAGE_KEY: &str = "chat-chats";

/// Reads and writes the whole conversation collection as one JSON blob.
#[derive(Clone)]
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    key: String,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `None` when nothing has been saved under the key yet.
    pub fn read(&self) -> ConversationStoreResult<Option<Vec<Conversation>>> {
        let Some(blob) = self.storage.get(&self.key).context(ReadBlobSnafu {
            stage: "read-conversation-blob",
            key: self.key.clone(),
        })?
        else {
            return Ok(None);
        };

        let conversations: Vec<Conversation> =
            serde_json::from_str(&blob).context(DecodeBlobSnafu {
                stage: "decode-conversation-blob",
                key: self.key.clone(),
            })?;

        let mut seen = HashSet::with_capacity(conversations.len());
        for conversation in &conversations {
            if !seen.insert(conversation.id.as_str()) {
                return DuplicateConversationIdSnafu {
                    stage: "validate-conversation-blob",
                    key: self.key.clone(),
                    id: conversation.id.to_string(),
                }
                .fail();
            }
        }

        Ok(Some(conversations))
    }

    /// Overwrites the stored blob with `conversations`.
    pub fn write(&self, conversations: &[Conversation]) -> ConversationStoreResult<()> {
        let blob = serde_json::to_string(conversations).context(EncodeBlobSnafu {
            stage: "encode-conversation-blob",
        })?;

        self.storage.set(&self.key, &blob).context(WriteBlobSnafu {
            stage: "write-conversation-blob",
            key: self.key.clone(),
        })
    }

    /// Moves the raw stored blob to a timestamped sibling key, leaving the
    /// primary key empty. Returns the new key, or `None` when nothing was stored.
    ///
    /// The copy is written before the original is removed.
    pub fn set_aside(&self) -> ConversationStoreResult<Option<String>> {
        let Some(blob) = self.storage.get(&self.key).context(ReadBlobSnafu {
            stage: "read-blob-to-set-aside",
            key: self.key.clone(),
        })?
        else {
            return Ok(None);
        };

        let backup_key = format!(
            "{}.rejected-{}",
            self.key,
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        self.storage
            .set(&backup_key, &blob)
            .context(WriteBlobSnafu {
                stage: "copy-blob-aside",
                key: backup_key.clone(),
            })?;
        self.storage.remove(&self.key).context(RemoveBlobSnafu {
            stage: "remove-set-aside-blob",
            key: self.key.clone(),
        })?;

        Ok(Some(backup_key))
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConversationStoreError {
    #[snafu(display("failed to read conversations from storage key '{key}'"))]
    ReadBlob {
        stage: &'static str,
        key: String,
        source: StorageError,
    },
    #[snafu(display("failed to write conversations to storage key '{key}'"))]
    WriteBlob {
        stage: &'static str,
        key: String,
        source: StorageError,
    },
    #[snafu(display("failed to remove conversations stored under '{key}'"))]
    RemoveBlob {
        stage: &'static str,
        key: String,
        source: StorageError,
    },
    #[snafu(display("failed to decode conversations stored under '{key}': {source}"))]
    DecodeBlob {
        stage: &'static str,
        key: String,
        source: serde_json::Error,
    },
    #[snafu(display("failed to encode conversations: {source}"))]
    EncodeBlob {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("conversations stored under '{key}' repeat id '{id}'"))]
    DuplicateConversationId {
        stage: &'static str,
        key: String,
        id: String,
    },
}

pub type ConversationStoreResult<T> = Result<T, ConversationStoreError>;
