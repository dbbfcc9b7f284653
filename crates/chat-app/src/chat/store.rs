use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::{ArcSwap, Guard};
use ruta_llm::{ChatBackend, ChatRequest};
use ruta_storage::KeyValueStore;
use snafu::{ResultExt, Snafu, ensure};
use tokio::sync::broadcast;

use crate::chat::events::ChatEvent;
use crate::chat::message::{Conversation, ConversationId, Message, Role};
use crate::database::{ConversationStore, ConversationStoreError};

/// Assistant reply shown in place of a real one when the exchange fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, an error occurred while processing your message. Please try again.";

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Immutable snapshot of everything the store tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    /// Most recently created first.
    pub conversations: Vec<Conversation>,
    pub active_conversation_id: Option<ConversationId>,
    pub is_loading: bool,
}

impl ChatState {
    pub fn conversation(&self, conversation_id: &ConversationId) -> Option<&Conversation> {
        self.conversations
            .iter()
            .find(|conversation| &conversation.id == conversation_id)
    }

    fn conversation_mut(&mut self, conversation_id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| &conversation.id == conversation_id)
    }

    /// The conversation named by the active id, if it still exists.
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_conversation_id
            .as_ref()
            .and_then(|conversation_id| self.conversation(conversation_id))
    }

    pub fn active_messages(&self) -> &[Message] {
        self.active_conversation()
            .map(|conversation| conversation.messages.as_slice())
            .unwrap_or_default()
    }
}

/// What [`ChatStore::load_conversations`] did with the persisted blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet; state untouched.
    Missing,
    Loaded { count: usize },
    /// Blob unreadable or invalid; state untouched and saving blocked until
    /// the blob is set aside or a later load succeeds.
    Rejected,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ChatStoreError {
    #[snafu(display("failed to persist conversations on `{stage}`: {source}"))]
    Persist {
        stage: &'static str,
        source: ConversationStoreError,
    },
    #[snafu(display(
        "refusing to overwrite unreadable conversations under '{key}' on `{stage}`"
    ))]
    SaveBlocked { stage: &'static str, key: String },
}

pub type ChatStoreResult<T> = Result<T, ChatStoreError>;

/// Client-side chat state: conversations, the active pointer and the loading flag.
///
/// Mutations swap in a new [`ChatState`] snapshot atomically, so readers never
/// block and no lock is held while a backend request is pending. Overlapping
/// sends are neither queued nor rejected; `is_loading` follows whichever send
/// settled last.
pub struct ChatStore {
    state: ArcSwap<ChatState>,
    backend: Arc<dyn ChatBackend>,
    persistence: ConversationStore,
    // Set while the stored blob is one the last load could not read.
    save_blocked: AtomicBool,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatStore {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        storage: Arc<dyn KeyValueStore>,
        storage_key: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: ArcSwap::from_pointee(ChatState::default()),
            backend,
            persistence: ConversationStore::new(storage, storage_key),
            save_blocked: AtomicBool::new(false),
            events,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Arc<ChatState> {
        self.state.load_full()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.load().conversations.clone()
    }

    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.state.load().active_conversation_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.load().is_loading
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        self.state.load().active_conversation().cloned()
    }

    pub fn active_messages(&self) -> Vec<Message> {
        self.state.load().active_messages().to_vec()
    }

    /// Inserts an empty conversation at the front and makes it active.
    pub fn create_conversation(&self) -> Conversation {
        let conversation = Conversation::new();
        self.update(|state| {
            state.conversations.insert(0, conversation.clone());
            state.active_conversation_id = Some(conversation.id.clone());
        });

        tracing::info!(conversation_id = %conversation.id, "created conversation");
        self.emit(ChatEvent::ConversationCreated {
            conversation_id: conversation.id.clone(),
        });
        conversation
    }

    /// Points the active id at `conversation_id` without checking that it exists.
    pub fn select_conversation(&self, conversation_id: ConversationId) {
        self.update(|state| state.active_conversation_id = Some(conversation_id.clone()));

        tracing::debug!(conversation_id = %conversation_id, "selected conversation");
        self.emit(ChatEvent::ConversationSelected { conversation_id });
    }

    /// Removes the conversation if present. Returns whether anything was removed.
    pub fn delete_conversation(&self, conversation_id: &ConversationId) -> bool {
        let active_after = self.update(|state| {
            let index = state
                .conversations
                .iter()
                .position(|conversation| &conversation.id == conversation_id)?;
            state.conversations.remove(index);

            if state.active_conversation_id.as_ref() == Some(conversation_id) {
                state.active_conversation_id = state
                    .conversations
                    .first()
                    .map(|conversation| conversation.id.clone());
            }
            Some(state.active_conversation_id.clone())
        });

        let Some(active_conversation_id) = active_after else {
            tracing::debug!(conversation_id = %conversation_id, "delete ignored, no such conversation");
            return false;
        };

        tracing::info!(conversation_id = %conversation_id, "deleted conversation");
        self.emit(ChatEvent::ConversationDeleted {
            conversation_id: conversation_id.clone(),
            active_conversation_id,
        });
        true
    }

    /// Appends `content` to the active conversation and the backend's answer after it.
    ///
    /// Failures never reach the caller: they are logged and answered with
    /// [`APOLOGY_MESSAGE`]. Does nothing when no conversation is active.
    pub async fn send_message(&self, content: impl Into<String>) {
        let content = content.into();

        let prepared = self.update(|state| {
            let conversation_id = state.active_conversation_id.clone()?;
            let conversation = state.conversation_mut(&conversation_id)?;

            let message = Message::user(content.clone());
            conversation.append(message.clone(), true);
            let retitled = conversation
                .adopt_title_from(&content)
                .then(|| conversation.title.clone());
            state.is_loading = true;

            Some((conversation_id, message, retitled))
        });

        let Some((conversation_id, user_message, retitled)) = prepared else {
            tracing::debug!("send ignored, no active conversation");
            return;
        };

        self.emit(ChatEvent::MessageAppended {
            conversation_id: conversation_id.clone(),
            message_id: user_message.id,
            role: Role::User,
        });
        if let Some(title) = retitled {
            self.emit(ChatEvent::TitleChanged {
                conversation_id: conversation_id.clone(),
                title,
            });
        }
        self.emit(ChatEvent::LoadingChanged { is_loading: true });

        // Clears the flag on every exit, including when this future is dropped mid-request.
        let _loading = LoadingGuard { store: self };

        let request = ChatRequest::new(content, conversation_id.as_str());
        let (reply, succeeded) = match self.backend.send_chat(request).await {
            Ok(reply) => (Message::assistant(reply.response), true),
            Err(error) => {
                tracing::error!(
                    conversation_id = %conversation_id,
                    error = %error,
                    "failed to send message"
                );
                (Message::assistant(APOLOGY_MESSAGE), false)
            }
        };

        let reply_id = reply.id.clone();
        let appended = self.update(|state| {
            let Some(conversation) = state.conversation_mut(&conversation_id) else {
                return false;
            };
            conversation.append(reply.clone(), succeeded);
            true
        });

        if appended {
            self.emit(ChatEvent::MessageAppended {
                conversation_id,
                message_id: reply_id,
                role: Role::Assistant,
            });
        } else {
            tracing::warn!(
                conversation_id = %conversation_id,
                "conversation deleted before reply arrived; reply dropped"
            );
        }
    }

    /// Replaces the in-memory collection with the persisted one.
    ///
    /// Read and parse failures are logged and leave the current state as is.
    pub fn load_conversations(&self) -> LoadOutcome {
        let outcome = self.persistence.read();
        self.save_blocked.store(outcome.is_err(), Ordering::SeqCst);

        match outcome {
            Ok(None) => {
                tracing::debug!(key = self.persistence.key(), "no saved conversations");
                LoadOutcome::Missing
            }
            Ok(Some(conversations)) => {
                let count = conversations.len();
                self.update(|state| state.conversations = conversations.clone());

                tracing::info!(count, key = self.persistence.key(), "loaded conversations");
                self.emit(ChatEvent::ConversationsLoaded { count });
                LoadOutcome::Loaded { count }
            }
            Err(error) => {
                tracing::warn!(
                    key = self.persistence.key(),
                    error = %error,
                    "failed to load conversations; keeping current state"
                );
                LoadOutcome::Rejected
            }
        }
    }

    /// Overwrites the persisted blob with the current collection.
    ///
    /// Fails with [`ChatStoreError::SaveBlocked`] after a [`LoadOutcome::Rejected`]
    /// load, so a blob that could not be read is never silently replaced.
    pub fn save_conversations(&self) -> ChatStoreResult<()> {
        ensure!(
            !self.save_blocked.load(Ordering::SeqCst),
            SaveBlockedSnafu {
                stage: "save-conversations",
                key: self.persistence.key(),
            }
        );

        let state = self.state.load();
        self.persistence
            .write(&state.conversations)
            .context(PersistSnafu {
                stage: "save-conversations",
            })?;

        tracing::debug!(
            count = state.conversations.len(),
            key = self.persistence.key(),
            "saved conversations"
        );
        Ok(())
    }

    /// Moves a blob that failed to load under a sibling key and unblocks saving.
    ///
    /// Returns the key now holding the old bytes, if there were any.
    pub fn set_aside_rejected_conversations(&self) -> ChatStoreResult<Option<String>> {
        let backup_key = self.persistence.set_aside().context(PersistSnafu {
            stage: "set-aside-rejected-conversations",
        })?;
        self.save_blocked.store(false, Ordering::SeqCst);

        if let Some(backup_key) = &backup_key {
            tracing::warn!(
                key = self.persistence.key(),
                backup_key = %backup_key,
                "moved unreadable conversations aside"
            );
        }
        Ok(backup_key)
    }

    fn set_loading(&self, is_loading: bool) {
        self.update(|state| state.is_loading = is_loading);
        self.emit(ChatEvent::LoadingChanged { is_loading });
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // Same retry loop as `ArcSwap::rcu`, but hands the closure's result back.
    fn update<R>(&self, mut apply: impl FnMut(&mut ChatState) -> R) -> R {
        let mut current = self.state.load_full();
        loop {
            let mut next = ChatState::clone(&current);
            let outcome = apply(&mut next);
            let previous = self.state.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return outcome;
            }
            current = Guard::into_inner(previous);
        }
    }
}

struct LoadingGuard<'a> {
    store: &'a ChatStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}
