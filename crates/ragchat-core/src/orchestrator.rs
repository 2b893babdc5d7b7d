//! Question submission cycle
//!
//! `Idle -> Submitting -> {Answered | Failed} -> Idle`. A cycle starts with
//! [`Orchestrator::submit`], which appends the user turn right away and spawns the network call
//! as an [`InFlight`] task.
//! [`Orchestrator::settle`] applies the outcome exactly once and returns the store to idle.
//! Callers that can block on the answer use [`Orchestrator::ask`], which does both.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::client::{AnswerService, AskRequest};
use crate::error::AskError;
use crate::message::Role;
use crate::store::ConversationStore;

/// A spawned `/ask` call that has not been settled yet
#[derive(Debug)]
pub struct InFlight {
    handle: JoinHandle<Result<String, AskError>>,
}

impl InFlight {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the call to complete. A task that panicked is reported as a local failure.
    pub async fn outcome(self) -> Result<String, AskError> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(AskError::local(join_err.to_string())),
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    service: Arc<dyn AnswerService>,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn AnswerService>) -> Self {
        Self { service }
    }

    /// Start a cycle for whatever is in `input`.
    ///
    /// Returns `None` without touching anything when the trimmed input is empty or a cycle is
    /// already outstanding. Otherwise the user turn is in the log, the store is awaiting and
    /// `input` is empty by the time this returns. Must be called inside a tokio runtime.
    pub fn submit(&self, store: &mut ConversationStore, input: &mut String) -> Option<InFlight> {
        if input.trim().is_empty() || store.is_awaiting() {
            return None;
        }

        let question = std::mem::take(input);
        // Context is the log before this question; the question travels on its own
        let request = AskRequest::new(question.clone(), store.messages());
        store.append_message(Role::User, question);
        store.set_awaiting(true);

        tracing::debug!(history_len = request.chat_history.len(), "Submitting question");

        let service = Arc::clone(&self.service);
        let handle = tokio::spawn(async move { service.ask(request).await });
        Some(InFlight { handle })
    }

    /// Apply the outcome of a cycle and leave the store idle.
    /// Returns the role of the turn appended.
    pub fn settle(
        &self,
        store: &mut ConversationStore,
        outcome: Result<String, AskError>,
    ) -> Role {
        let role = match outcome {
            Ok(answer) => {
                tracing::info!(answer_len = answer.len(), "Answer received");
                store.append_message(Role::Assistant, answer);
                Role::Assistant
            }
            Err(err) => {
                tracing::warn!(error = %err, "Question failed");
                store.append_message(Role::Error, err.chat_message());
                Role::Error
            }
        };
        store.set_awaiting(false);
        role
    }

    /// Run a whole cycle to completion. `None` if the submission was skipped.
    pub async fn ask(&self, store: &mut ConversationStore, input: &mut String) -> Option<Role> {
        let in_flight = self.submit(store, input)?;
        let outcome = in_flight.outcome().await;
        Some(self.settle(store, outcome))
    }
}
