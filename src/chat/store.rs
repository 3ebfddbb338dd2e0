//! Chat history store.
//!
//! Every operation works on the full history as a value: read it from
//! storage, change it, write it back. Storage failures are logged and
//! degrade to an empty history or a skipped write so that history
//! never breaks the chat flow.
use chrono::Utc;
use uuid::Uuid;

use super::models::{ChatHistory, ChatSession, MAX_SESSIONS, Message, Sender, title_from_message};
use super::storage::{Storage, StorageError};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct ChatStore<S: Storage> {
    storage: S,
}

impl<S: Storage> ChatStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read_history(&self) -> Result<ChatHistory, StorageError> {
        match self.storage.read()? {
            Some(blob) => Ok(serde_json::from_str(&blob)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_history(&self, history: &ChatHistory) {
        let result = serde_json::to_string(history)
            .map_err(StorageError::from)
            .and_then(|blob| self.storage.write(&blob));
        if let Err(e) = result {
            tracing::error!("Error saving chat history: {}", e);
        }
    }

    /// All stored sessions in storage order. Missing or corrupt
    /// storage reads as an empty history.
    pub fn list_sessions(&self) -> ChatHistory {
        self.read_history().unwrap_or_else(|e| {
            tracing::error!("Error loading chat history: {}", e);
            Vec::new()
        })
    }

    pub fn get_session(&self, id: &str) -> Option<ChatSession> {
        self.list_sessions().into_iter().find(|s| s.id == id)
    }

    /// Build a new, unsaved session. It is only persisted by the first
    /// call to `save_session`.
    pub fn create_session(&self, first_message: &str) -> ChatSession {
        let now = now_millis();
        ChatSession {
            id: Uuid::new_v4().to_string(),
            title: title_from_message(first_message),
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Insert or replace a session by id and return the resulting
    /// history. New sessions go to the front, existing ones are
    /// replaced where they are. The history is capped at
    /// `MAX_SESSIONS` entries.
    pub fn save_session(&self, session: &ChatSession) -> ChatHistory {
        let mut history = self.list_sessions();
        let existing = history.iter().position(|s| s.id == session.id);

        // `last_updated` strictly increases per record even when two
        // saves land in the same millisecond
        let previous = existing
            .map(|idx| history[idx].last_updated)
            .unwrap_or(i64::MIN)
            .max(session.last_updated);
        let mut to_save = session.clone();
        to_save.last_updated = now_millis().max(previous.saturating_add(1));

        match existing {
            Some(idx) => history[idx] = to_save,
            None => history.insert(0, to_save),
        }
        history.truncate(MAX_SESSIONS);

        self.write_history(&history);
        history
    }

    /// Remove a session by id. Unknown ids are not an error.
    pub fn delete_session(&self, id: &str) -> ChatHistory {
        let mut history = self.list_sessions();
        let before = history.len();
        history.retain(|s| s.id != id);
        if history.len() != before {
            self.write_history(&history);
        } else {
            tracing::debug!("Delete of unknown chat session {}", id);
        }
        history
    }

    /// Recompute a stored session's title from the first user message
    /// in `messages`. Does nothing without a user message or when the
    /// session isn't stored.
    pub fn rename_session_from_messages(&self, id: &str, messages: &[Message]) {
        let Some(first_user_msg) = messages.iter().find(|m| m.sender == Sender::User) else {
            return;
        };
        let Some(mut session) = self.get_session(id) else {
            return;
        };
        session.title = title_from_message(&first_user_msg.text);
        self.save_session(&session);
    }

    pub fn clear_all(&self) {
        if let Err(e) = self.storage.remove() {
            tracing::error!("Error clearing chat history: {}", e);
        }
    }

    /// The full history as pretty printed JSON for backups.
    pub fn export_history(&self) -> String {
        let history = self.list_sessions();
        serde_json::to_string_pretty(&history).unwrap_or_else(|e| {
            tracing::error!("Error exporting chat history: {}", e);
            String::from("[]")
        })
    }
}
