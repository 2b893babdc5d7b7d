use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::error::AskError;
use crate::message::{Message, Role};

/// The answering service rejects longer questions; catch them before sending.
pub const MAX_QUESTION_CHARS: usize = 5000;

/// A prior turn as the answering service receives it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role(),
            content: msg.content().to_string(),
            timestamp: msg.display_time(),
        }
    }
}

/// Body of `POST /ask`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub chat_history: Vec<HistoryEntry>,
}

impl AskRequest {
    /// `context` is the log as it stood before `question` was appended
    pub fn new(question: impl Into<String>, context: &[Message]) -> Self {
        Self {
            question: question.into(),
            chat_history: context.iter().map(HistoryEntry::from).collect(),
        }
    }
}

#[derive(Deserialize)]
struct AskResponse {
    answer: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Anything that can turn a question plus context into an answer.
///
/// Implementations must report transport failures as `AskError::Unreachable` and keep them
/// apart from responses the service actually sent.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, request: AskRequest) -> Result<String, AskError>;
}

#[derive(Clone)]
pub struct HttpAnswerClient {
    client: Client,
    base_url: String,
}

impl HttpAnswerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client with a transport-level timeout. A request that times out counts as unanswered.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Health check failed with status: {}", response.status()));
        }

        let health: HealthStatus = response.json().await?;
        Ok(health)
    }
}

#[async_trait]
impl AnswerService for HttpAnswerClient {
    async fn ask(&self, request: AskRequest) -> Result<String, AskError> {
        let question_chars = request.question.chars().count();
        if question_chars > MAX_QUESTION_CHARS {
            return Err(AskError::local(format!(
                "question exceeds {} characters",
                MAX_QUESTION_CHARS
            )));
        }

        let url = format!("{}/ask", self.base_url);
        tracing::debug!(
            url = %url,
            history_len = request.chat_history.len(),
            "Sending question"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Body is optional; anything unreadable just means no detail
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.detail)
                .and_then(|d| d.as_str().map(str::to_string));
            return Err(AskError::server(status.as_u16(), detail));
        }

        let body = response.text().await?;
        let answer: AskResponse = serde_json::from_str(&body)
            .map_err(|e| AskError::local(format!("malformed answer from server: {}", e)))?;
        Ok(answer.answer)
    }
}
