//! Plain-text transcript export

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use crate::message::Message;
use crate::store::ConversationStore;

/// Shown instead of producing a file when the log is empty
pub const EMPTY_EXPORT_NOTICE: &str = "No conversation to export!";

pub const TRANSCRIPT_MIME: &str = "text/plain";

/// A rendered transcript ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub file_name: String,
    pub mime_type: &'static str,
    pub body: String,
}

impl Transcript {
    /// Render the store's log, named with today's UTC date. `None` when there is nothing to export.
    pub fn from_store(store: &ConversationStore) -> Option<Self> {
        Self::render(store.messages(), Utc::now().date_naive())
    }

    pub fn render(messages: &[Message], date: NaiveDate) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }

        let body = messages
            .iter()
            .map(|msg| {
                format!(
                    "[{}] {}: {}",
                    msg.display_time(),
                    msg.role().label(),
                    msg.content()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        Some(Self {
            file_name: file_name_for(date),
            mime_type: TRANSCRIPT_MIME,
            body,
        })
    }

    /// Write into `dir`, creating it if needed. Returns the full path written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.body)?;
        tracing::info!(path = %path.display(), "Exported conversation");
        Ok(path)
    }
}

pub fn file_name_for(date: NaiveDate) -> String {
    format!("chat-{}.txt", date.format("%Y-%m-%d"))
}
