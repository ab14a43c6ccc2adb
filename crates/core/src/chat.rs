//! Chat transcript.
//!
//! Streamed answers are merged into the transcript one message at a time:
//! every update names its target by [`MessageId`] and touches nothing else.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stream::StreamEvent;
use crate::types::Reference;

/// Opening assistant message shown before the first question.
pub const GREETING: &str = "Hello, owner! How can I help? Ask me anything about store operations.";

/// Appended to an assistant message whose turn failed.
pub const ERROR_NOTICE: &str = "\n\n[An error occurred. Please try again shortly.]";

/// Identifier of one message in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub references: Option<Vec<Reference>>,
    /// Set once the error notice has been appended.
    #[serde(default)]
    pub failed: bool,
}

impl Message {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            references: None,
            failed: false,
        }
    }

    #[must_use]
    pub const fn is_user(&self) -> bool {
        matches!(self.role, MessageRole::User)
    }
}

/// Ordered transcript of one chat session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    /// A transcript opening with the assistant greeting.
    #[must_use]
    pub fn with_greeting() -> Self {
        let mut list = Self::default();
        list.messages.push(Message::new(MessageRole::Assistant, GREETING));
        list
    }

    /// Append the user's question.
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        let message = Message::new(MessageRole::User, content);
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Append a complete assistant message.
    pub fn push_assistant(
        &mut self,
        content: impl Into<String>,
        references: Option<Vec<Reference>>,
    ) -> MessageId {
        let mut message = Message::new(MessageRole::Assistant, content);
        message.references = references;
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Append the empty assistant message a streamed turn will fill.
    pub fn begin_assistant(&mut self) -> MessageId {
        self.push_assistant(String::new(), None)
    }

    #[must_use]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Overwrite the message with `message.id`, or append it if absent.
    pub fn upsert(&mut self, message: Message) {
        match self.get_mut(message.id) {
            Some(existing) => *existing = message,
            None => self.messages.push(message),
        }
    }

    /// Merge one stream event into the message `id`.
    ///
    /// References attach once; later `meta` events are ignored. Returns
    /// whether the message changed.
    pub fn apply(&mut self, id: MessageId, event: &StreamEvent) -> bool {
        match event {
            StreamEvent::Meta(references) => {
                let Some(message) = self.get_mut(id) else {
                    return false;
                };
                if message.references.is_some() {
                    return false;
                }
                message.references = Some(references.clone());
                true
            }
            StreamEvent::Chunk(text) => {
                let Some(message) = self.get_mut(id) else {
                    return false;
                };
                message.content.push_str(text);
                !text.is_empty()
            }
            StreamEvent::Error(_) => self.mark_failed(id),
        }
    }

    /// Append the error notice to message `id`, at most once.
    pub fn mark_failed(&mut self, id: MessageId) -> bool {
        match self.get_mut(id) {
            Some(message) if !message.failed => {
                message.content.push_str(ERROR_NOTICE);
                message.failed = true;
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
