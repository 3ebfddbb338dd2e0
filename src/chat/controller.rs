//! Orchestrates the active chat: owns the in-memory draft, persists it
//! through the chat store and gets responses from the prompt relay.
//!
//! Every persistence write is an explicit step inside one of the
//! command methods below. A turn is split in two (`begin_turn` and
//! `finish_turn`) so a front end can render the loading placeholder
//! while the relay call is in flight; `on_user_submit` runs both.
use thiserror::Error;

use super::models::{ChatHistory, ChatSession, DEFAULT_TITLE, Message, Sender, title_from_message};
use super::storage::Storage;
use super::store::ChatStore;
use crate::relay::{PromptRelay, RelayError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("a response is still pending for this chat")]
    SendInProgress,
}

/// A relay call that has been started but not settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    turn_id: u64,
    pub session_id: String,
    pub prompt: String,
    placeholder_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The placeholder was replaced with this message
    Completed(Message),
    /// The active chat changed while the call was in flight
    Cancelled,
}

/// One row of the chat listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub last_updated: i64,
    pub is_current: bool,
}

/// Strip the markdown emphasis markers the model likes to emit.
pub fn clean_response(text: &str) -> String {
    text.replace('*', "")
}

pub struct SessionController<S: Storage, R: PromptRelay> {
    store: ChatStore<S>,
    relay: R,
    draft: Option<ChatSession>,
    pending: Option<u64>,
    next_turn_id: u64,
}

impl<S: Storage, R: PromptRelay> SessionController<S, R> {
    pub fn new(store: ChatStore<S>, relay: R) -> Self {
        Self {
            store,
            relay,
            draft: None,
            pending: None,
            next_turn_id: 0,
        }
    }

    pub fn store(&self) -> &ChatStore<S> {
        &self.store
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn active_messages(&self) -> &[Message] {
        self.draft
            .as_ref()
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.draft.as_ref().map(|s| s.id.as_str())
    }

    pub fn session_active(&self) -> bool {
        !self.active_messages().is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Persist the draft without any loading placeholders.
    fn save_draft(&mut self) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let mut record = draft.clone();
        record.messages.retain(|m| !m.loading);
        let history = self.store.save_session(&record);
        if let Some(saved) = history.iter().find(|s| s.id == draft.id) {
            draft.last_updated = saved.last_updated;
        }
    }

    /// Record the user's message and a loading placeholder. Returns
    /// `None` for blank input.
    pub fn begin_turn(&mut self, text: &str) -> Result<Option<PendingTurn>, ControllerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.pending.is_some() {
            return Err(ControllerError::SendInProgress);
        }

        // Sessions are created lazily on the first message
        let store = &self.store;
        let draft = self.draft.get_or_insert_with(|| store.create_session(text));
        if !draft.messages.iter().any(|m| m.sender == Sender::User) {
            draft.title = title_from_message(text);
        }
        draft.messages.push(Message::user(text));
        let session_id = draft.id.clone();
        self.save_draft();

        let Some(draft) = self.draft.as_mut() else {
            return Ok(None);
        };
        draft.messages.push(Message::placeholder());
        let placeholder_index = draft.messages.len() - 1;

        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;
        self.pending = Some(turn_id);

        Ok(Some(PendingTurn {
            turn_id,
            session_id,
            prompt: text.to_string(),
            placeholder_index,
        }))
    }

    /// Replace the turn's placeholder with the relay's response, or
    /// with error text when the relay failed, and persist the result.
    pub fn finish_turn(
        &mut self,
        turn: PendingTurn,
        result: Result<String, RelayError>,
    ) -> TurnOutcome {
        let is_current = self.pending == Some(turn.turn_id)
            && self.active_session_id() == Some(turn.session_id.as_str());
        if !is_current {
            tracing::debug!(
                "Dropping response for detached chat session {}",
                turn.session_id
            );
            return TurnOutcome::Cancelled;
        }
        self.pending = None;

        let text = match result {
            Ok(text) => clean_response(&text),
            Err(e) => {
                tracing::error!("Error fetching response: {}", e);
                e.display_text()
            }
        };
        let msg = Message::ai(&text);

        if let Some(slot) = self
            .draft
            .as_mut()
            .and_then(|d| d.messages.get_mut(turn.placeholder_index))
        {
            *slot = msg.clone();
        }
        self.save_draft();

        TurnOutcome::Completed(msg)
    }

    /// Send one message and wait for the response. Returns the final
    /// AI message, or `None` when the input was blank.
    pub async fn on_user_submit(&mut self, text: &str) -> Result<Option<Message>, ControllerError> {
        let Some(turn) = self.begin_turn(text)? else {
            return Ok(None);
        };
        let result = self.relay.send(&turn.prompt).await;
        match self.finish_turn(turn, result) {
            TurnOutcome::Completed(msg) => Ok(Some(msg)),
            TurnOutcome::Cancelled => Ok(None),
        }
    }

    /// Reset to an empty, unsaved chat. Stored sessions are untouched.
    pub fn on_new_chat(&mut self) {
        self.draft = None;
        self.pending = None;
    }

    /// Load a stored session as the active chat. Returns `false` and
    /// changes nothing when the id is unknown.
    pub fn on_select_chat(&mut self, id: &str) -> bool {
        let Some(mut session) = self.store.get_session(id) else {
            return false;
        };
        if session.title == DEFAULT_TITLE
            && session.messages.iter().any(|m| m.sender == Sender::User)
        {
            self.store
                .rename_session_from_messages(&session.id, &session.messages);
            if let Some(renamed) = self.store.get_session(id) {
                session = renamed;
            }
        }
        self.draft = Some(session);
        self.pending = None;
        true
    }

    /// Delete a stored session, starting a fresh chat if it was the
    /// active one.
    pub fn on_delete_chat(&mut self, id: &str) -> ChatHistory {
        let history = self.store.delete_session(id);
        if self.active_session_id() == Some(id) {
            self.on_new_chat();
        }
        history
    }

    /// Stored sessions in listing order with the active one marked.
    pub fn sidebar(&self) -> Vec<SessionSummary> {
        let current = self.active_session_id();
        self.store
            .list_sessions()
            .into_iter()
            .map(|s| SessionSummary {
                is_current: current == Some(s.id.as_str()),
                id: s.id,
                title: s.title,
                last_updated: s.last_updated,
            })
            .collect()
    }
}
