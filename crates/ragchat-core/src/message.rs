//! Conversation turns
//!
//! Shared by the store, the request payload and the transcript export. Nothing here
//! depends on a UI framework.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Display format for timestamps, e.g. `3:04:05 PM`.
pub const TIME_FORMAT: &str = "%-I:%M:%S %p";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Error => "error",
        }
    }

    /// Label used in exported transcripts and the chat pane
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Bot",
            Role::Error => "Error",
        }
    }
}

/// One turn in the conversation.
///
/// Fields are private so the timestamp cannot change after the message is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    role: Role,
    content: String,
    timestamp: DateTime<Local>,
}

impl Message {
    /// Build a message stamped with the current local time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self::at(role, content, Local::now())
    }

    pub fn at(role: Role, content: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn display_time(&self) -> String {
        self.timestamp.format(TIME_FORMAT).to_string()
    }
}
