//! Conversation store
//!
//! Single owner of the message log and the awaiting flag. Every mutation goes through a
//! method here and observers hear about it before the method returns, so a renderer never
//! sees the log out of step with what the orchestrator just did.

use crate::message::{Message, Role};

/// A change applied to the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreEvent<'a> {
    Appended(&'a Message),
    Cleared,
    AwaitingChanged(bool),
}

type Observer = Box<dyn FnMut(StoreEvent<'_>) + Send>;

#[derive(Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    awaiting: bool,
    observers: Vec<Observer>,
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("messages", &self.messages)
            .field("awaiting", &self.awaiting)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback that runs synchronously after each mutation
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(StoreEvent<'_>) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    /// Whether a user-facing clear action should be enabled
    pub fn can_clear(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Copy of the log in insertion order, used as request context
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Append a message stamped with the current time
    pub fn append_message(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.messages.push(Message::new(role, content));
        let idx = self.messages.len() - 1;
        let appended = &self.messages[idx];
        for observer in &mut self.observers {
            observer(StoreEvent::Appended(appended));
        }
        appended
    }

    /// Empty the log. Returns false (and notifies nobody) when it was already empty.
    pub fn clear(&mut self) -> bool {
        if self.messages.is_empty() {
            return false;
        }
        self.messages.clear();
        self.notify(StoreEvent::Cleared);
        true
    }

    pub fn set_awaiting(&mut self, awaiting: bool) {
        if self.awaiting == awaiting {
            return;
        }
        self.awaiting = awaiting;
        self.notify(StoreEvent::AwaitingChanged(awaiting));
    }

    fn notify(&mut self, event: StoreEvent<'_>) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_append_preserves_order() {
        let mut store = ConversationStore::new();
        store.append_message(Role::User, "first");
        store.append_message(Role::Assistant, "second");
        store.append_message(Role::Error, "");

        let roles: Vec<Role> = store.messages().iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Error]);
        assert_eq!(store.messages()[1].content(), "second");
        assert_eq!(store.last().map(|m| m.content()), Some(""));
    }

    #[test]
    fn test_timestamp_taken_at_append() {
        let mut store = ConversationStore::new();
        let before = Local::now();
        let ts = store.append_message(Role::User, "hello").timestamp();
        let after = Local::now();
        assert!(before <= ts && ts <= after);
    }

    #[test]
    fn test_clear_empty_is_noop() {
        let mut store = ConversationStore::new();
        assert!(!store.can_clear());
        assert!(!store.clear());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut store = ConversationStore::new();
        store.append_message(Role::User, "a");
        store.append_message(Role::Assistant, "b");
        assert!(store.can_clear());

        assert!(store.clear());
        assert!(store.is_empty());
        assert!(!store.clear());
        assert!(store.is_empty());
    }

    #[test]
    fn test_observers_notified_synchronously() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut store = ConversationStore::new();
        store.subscribe(move |event| {
            let entry = match event {
                StoreEvent::Appended(msg) => format!("append:{}", msg.content()),
                StoreEvent::Cleared => "clear".to_string(),
                StoreEvent::AwaitingChanged(flag) => format!("awaiting:{}", flag),
            };
            sink.lock().unwrap().push(entry);
        });

        store.append_message(Role::User, "q");
        assert_eq!(seen.lock().unwrap().len(), 1);

        store.set_awaiting(true);
        store.set_awaiting(true);
        store.set_awaiting(false);
        store.clear();
        store.clear();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["append:q", "awaiting:true", "awaiting:false", "clear"]
        );
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = ConversationStore::new();
        store.append_message(Role::User, "a");
        let snapshot = store.snapshot();
        store.append_message(Role::Assistant, "b");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }
}
