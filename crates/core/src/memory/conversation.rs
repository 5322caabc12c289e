//! # Conversation Store
//!
//! In-memory conversation threads for agents that remember prior turns.

use crate::skills::llm_helpers::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread every agent uses; the system serves one user session.
pub const DEFAULT_THREAD: &str = "themify-session";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    pub agent: String,
    pub thread: String,
}

impl MemoryKey {
    pub fn new(agent: impl Into<String>, thread: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            thread: thread.into(),
        }
    }
}

/// Process-wide store of conversation threads
#[derive(Debug, Default)]
pub struct ConversationStore {
    threads: RwLock<HashMap<MemoryKey, Vec<ChatMessage>>>,
}

impl ConversationStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handle bound to an agent's default thread
    pub fn handle(self: &Arc<Self>, agent: &str) -> MemoryHandle {
        MemoryHandle {
            store: Arc::clone(self),
            key: MemoryKey::new(agent, DEFAULT_THREAD),
        }
    }

    pub async fn history(&self, key: &MemoryKey) -> Vec<ChatMessage> {
        self.threads
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn append(&self, key: &MemoryKey, messages: impl IntoIterator<Item = ChatMessage>) {
        let mut threads = self.threads.write().await;
        threads.entry(key.clone()).or_default().extend(messages);
    }

    pub async fn len(&self, key: &MemoryKey) -> usize {
        self.threads.read().await.get(key).map_or(0, Vec::len)
    }

    pub async fn clear(&self, key: &MemoryKey) {
        self.threads.write().await.remove(key);
    }
}

/// An agent's view of its own thread
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    store: Arc<ConversationStore>,
    key: MemoryKey,
}

impl MemoryHandle {
    pub fn key(&self) -> &MemoryKey {
        &self.key
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.store.history(&self.key).await
    }

    pub async fn append(&self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.store.append(&self.key, messages).await
    }

    pub async fn len(&self) -> usize {
        self.store.len(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_threads_are_isolated_per_agent() {
        let store = ConversationStore::new();
        let coder = store.handle("coder");
        let feedback = store.handle("feedback-coder");

        coder
            .append([ChatMessage::user("build it"), ChatMessage::assistant("code")])
            .await;

        assert_eq!(coder.len().await, 2);
        assert_eq!(feedback.len().await, 0);
        assert_eq!(coder.history().await[1].content, "code");
    }

    #[tokio::test]
    async fn test_handles_share_the_store() {
        let store = ConversationStore::new();
        store.handle("architect").append([ChatMessage::user("hi")]).await;

        let again = store.handle("architect");
        assert_eq!(again.history().await, vec![ChatMessage::user("hi")]);

        store.clear(again.key()).await;
        assert_eq!(again.len().await, 0);
    }
}
