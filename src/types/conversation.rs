use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Message, MessageRole};

/// Title every conversation carries until its first exchange is recorded.
pub const DEFAULT_TITLE: &str = "New Chat";

/// A titled, ordered sequence of messages.
///
/// The title starts out as [`DEFAULT_TITLE`] and is replaced exactly once, after
/// the first user/assistant pair has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    /// Unique identifier, generated at creation.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Messages in send order.
    pub messages: Vec<Message>,

    /// When the conversation was last updated.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,
}

impl Conversation {
    /// Creates an empty conversation with a fresh id and the default title.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Returns true while the title is still the placeholder.
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Returns true if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a completed user/assistant exchange and bumps the timestamp.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
        self.touch();
    }

    /// Marks the conversation as updated now.
    pub fn touch(&mut self) {
        self.timestamp = OffsetDateTime::now_utc();
    }

    /// Renders the transcript as `ROLE: content` blocks separated by blank lines.
    pub fn export(&self) -> String {
        self.messages
            .iter()
            .map(|msg| format!("{}: {}", msg.role.label(), msg.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Counts the messages authored by `role`.
    pub fn count_role(&self, role: MessageRole) -> usize {
        self.messages.iter().filter(|msg| msg.role == role).count()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// File name offered for an exported transcript.
pub fn export_file_name(date: time::Date) -> String {
    format!(
        "chat-export-{:04}-{:02}-{:02}.txt",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn new_conversations_get_unique_ids() {
        let a = Conversation::new();
        let b = Conversation::new();
        assert_ne!(a.id, b.id);
        assert!(a.has_default_title());
        assert!(a.is_empty());
    }

    #[test]
    fn export_joins_with_blank_lines() {
        let mut conversation = Conversation::new();
        conversation.push_exchange("Hi", "Hello!\nHow can I help?");
        assert_eq!(
            conversation.export(),
            "USER: Hi\n\nASSISTANT: Hello!\nHow can I help?"
        );
        assert_eq!(conversation.count_role(MessageRole::User), 1);
    }

    #[test]
    fn export_of_empty_conversation_is_empty() {
        assert_eq!(Conversation::new().export(), "");
    }

    #[test]
    fn export_file_name_uses_iso_date() {
        assert_eq!(
            export_file_name(date!(2024 - 03 - 07)),
            "chat-export-2024-03-07.txt"
        );
    }

    #[test]
    fn timestamp_round_trips_as_rfc3339() {
        let conversation = Conversation::new();
        let json = serde_json::to_value(&conversation).unwrap();
        assert!(json["timestamp"].is_string());
        let back: Conversation = serde_json::from_value(json).unwrap();
        assert_eq!(back.timestamp, conversation.timestamp);
    }
}
