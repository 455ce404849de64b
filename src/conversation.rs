//! Ephemeral in-memory conversation history.
//!
//! Conversations live only for the lifetime of the process. The server runs
//! [`ConversationStore::cleanup`] periodically to drop conversations older
//! than `conversation.max_age_secs`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::models::ChatMessage;

struct Conversation {
    created_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }
}

/// Thread-safe map of conversation id to message history.
#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new conversation and return its id (a UUID v4).
    pub fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.write().insert(id.clone(), Conversation::new());
        id
    }

    /// Register a client-supplied id if it is not already known.
    pub fn ensure(&self, id: &str) {
        self.write()
            .entry(id.to_string())
            .or_insert_with(Conversation::new);
    }

    /// Append a message. Returns `false` if the conversation does not exist.
    pub fn append(&self, id: &str, message: ChatMessage) -> bool {
        match self.write().get_mut(id) {
            Some(conv) => {
                conv.messages.push(message);
                true
            }
            None => false,
        }
    }

    /// Messages of a conversation in order. Empty for unknown ids.
    pub fn history(&self, id: &str) -> Vec<ChatMessage> {
        self.read()
            .get(id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop conversations older than `max_age`. Returns how many were removed.
    ///
    /// A `max_age` reaching past the earliest representable time removes
    /// nothing.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        match Utc::now().checked_sub_signed(max_age) {
            Some(cutoff) => self.remove_created_before(cutoff),
            None => 0,
        }
    }

    fn remove_created_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut map = self.write();
        let before = map.len();
        map.retain(|_, c| c.created_at >= cutoff);
        before - map.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Conversation>> {
        self.conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
