//! Failure classes for a question submission

use thiserror::Error;

/// Shown when the request went out but nothing came back.
pub const UNREACHABLE_MESSAGE: &str =
    "Unable to connect to the server. Please ensure the backend is running.";

/// Why an `/ask` call did not produce an answer.
///
/// The split matters for what the user sees: a server that answered with an error gets its
/// own words quoted back, a silent one gets a fixed hint about the backend.
#[derive(Debug, Error)]
pub enum AskError {
    /// The service responded with a non-success status
    #[error("server responded with status {status}")]
    Server { status: u16, detail: Option<String> },

    /// The request was sent but no response arrived (refused, unreachable, timed out)
    #[error("no response from answering service: {0}")]
    Unreachable(String),

    /// The request could not be built or sent at all
    #[error("request failed before sending: {0}")]
    Local(String),
}

impl AskError {
    pub fn server(status: u16, detail: Option<String>) -> Self {
        Self::Server { status, detail }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable(reason.into())
    }

    pub fn local(reason: impl Into<String>) -> Self {
        Self::Local(reason.into())
    }

    /// Text appended to the conversation as an error turn
    pub fn chat_message(&self) -> String {
        match self {
            AskError::Server { status, detail } => match detail.as_deref() {
                Some(detail) if !detail.is_empty() => detail.to_string(),
                _ => format!("Server error: {}", status),
            },
            AskError::Unreachable(_) => UNREACHABLE_MESSAGE.to_string(),
            AskError::Local(reason) => format!("Error: {}", reason),
        }
    }
}

impl From<reqwest::Error> for AskError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            AskError::Local(err.to_string())
        } else if let Some(status) = err.status() {
            AskError::Server {
                status: status.as_u16(),
                detail: None,
            }
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            AskError::Unreachable(err.to_string())
        } else {
            AskError::Local(err.to_string())
        }
    }
}
