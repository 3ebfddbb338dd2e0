//! The records persisted by the chat store.
use serde::{Deserialize, Serialize};

/// Maximum number of sessions kept in the history.
pub const MAX_SESSIONS: usize = 50;

/// Maximum number of characters of the first message used as a title.
pub const MAX_TITLE_CHARS: usize = 50;

pub const DEFAULT_TITLE: &str = "New Chat";

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Ai,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub loading: bool,
}

impl Message {
    pub fn user(text: &str) -> Self {
        Self {
            sender: Sender::User,
            text: text.to_string(),
            loading: false,
        }
    }

    pub fn ai(text: &str) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.to_string(),
            loading: false,
        }
    }

    /// A pending AI response that gets replaced in place once the
    /// relay settles.
    pub fn placeholder() -> Self {
        Self {
            sender: Sender::Ai,
            text: String::new(),
            loading: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Unix epoch millis
    pub created_at: i64,
    /// Unix epoch millis, refreshed on every save
    pub last_updated: i64,
}

/// Most recently written session first.
pub type ChatHistory = Vec<ChatSession>;

/// Derive a session title from the first user message.
pub fn title_from_message(message: &str) -> String {
    let clean = message.trim().replace('\n', " ");
    if clean.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if clean.chars().count() > MAX_TITLE_CHARS {
        let truncated: String = clean.chars().take(MAX_TITLE_CHARS).collect();
        format!("{}...", truncated)
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_gets_default_title() {
        assert_eq!(title_from_message(""), "New Chat");
        assert_eq!(title_from_message("  \n "), "New Chat");
    }

    #[test]
    fn test_long_message_is_truncated() {
        let title = title_from_message(&"x".repeat(60));
        assert_eq!(title, format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn test_exactly_fifty_chars_is_kept() {
        let msg = "y".repeat(50);
        assert_eq!(title_from_message(&msg), msg);
    }

    #[test]
    fn test_newlines_become_spaces() {
        assert_eq!(title_from_message(" Hello\nthere "), "Hello there");
    }

    #[test]
    fn test_truncates_on_char_boundaries() {
        let title = title_from_message(&"é".repeat(55));
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_reads_records_without_optional_fields() {
        let raw = r#"{
            "id": "abc",
            "title": "Hi",
            "messages": [{"sender": "user", "text": "Hi"}, {"sender": "ai", "loading": true}],
            "createdAt": 1,
            "lastUpdated": 2
        }"#;
        let session: ChatSession = serde_json::from_str(raw).unwrap();
        assert_eq!(session.messages[0], Message::user("Hi"));
        assert_eq!(session.messages[1], Message::placeholder());
        assert_eq!(session.last_updated, 2);
    }
}
