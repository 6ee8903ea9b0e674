use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A single entry in a conversation.
///
/// Messages are values: the identifier and creation time are fixed at construction and a
/// streaming update produces a new `Message` through [`Message::with_text`] that keeps both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    text: String,
    is_from_user: bool,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl Message {
    /// Create a message authored by the user, timestamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), text, true, OffsetDateTime::now_utc())
    }

    /// Create a message authored by the assistant, timestamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), text, false, OffsetDateTime::now_utc())
    }

    /// Create a message from all of its parts.
    pub fn new(
        id: Uuid,
        text: impl Into<String>,
        is_from_user: bool,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            is_from_user,
            created_at,
        }
    }

    /// The same message with its text replaced.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Identifier, unique within a conversation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Message body.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True for user input, false for assistant output (including error reports).
    pub fn is_from_user(&self) -> bool {
        self.is_from_user
    }

    /// When the message was created.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}
