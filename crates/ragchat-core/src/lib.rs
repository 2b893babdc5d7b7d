pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod message;
pub mod orchestrator;
pub mod store;

// Re-export main types for convenience
pub use client::{AnswerService, AskRequest, HealthStatus, HttpAnswerClient, MAX_QUESTION_CHARS};
pub use config::Config;
pub use error::AskError;
pub use export::{Transcript, EMPTY_EXPORT_NOTICE};
pub use message::{Message, Role};
pub use orchestrator::{InFlight, Orchestrator};
pub use store::{ConversationStore, StoreEvent};
