//! Ordered, role-tagged conversation history.

use chat_api::{ChatMessage, ChatRequest, ChatRole};
use tracing::warn;

use crate::error::ConversationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Consecutive user messages are allowed (a failed turn leaves its prompt).
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        self.push(ChatMessage::user(content))
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        self.push(ChatMessage::assistant(content))
    }

    /// Entries are never merged; an assistant message directly after another is
    /// rejected.
    pub fn push(&mut self, message: ChatMessage) -> Result<(), ConversationError> {
        if message.content.is_empty() {
            return Err(ConversationError::EmptyContent);
        }
        if message.role == ChatRole::Assistant
            && self
                .messages
                .last()
                .is_some_and(|last| last.role == ChatRole::Assistant)
        {
            warn!("rejecting consecutive assistant message");
            return Err(ConversationError::ConsecutiveAssistant);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Snapshot of the full history as a request body.
    pub fn to_request(&self) -> ChatRequest {
        ChatRequest::new(self.messages.clone())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
