//! UI-agnostic transcript types
//!
//! Messages are immutable once created and the transcript only ever grows,
//! so insertion order is chronological order.

use serde::{Deserialize, Serialize};

pub type MessageId = u64;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

/// A single entry in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
    sources: Vec<String>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

/// Append-only message log that hands out increasing ids.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: MessageId,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.push(text.into(), Sender::User, Vec::new())
    }

    pub fn push_bot(&mut self, text: impl Into<String>, sources: Vec<String>) -> MessageId {
        self.push(text.into(), Sender::Bot, sources)
    }

    fn push(&mut self, text: String, sender: Sender, sources: Vec<String>) -> MessageId {
        self.next_id += 1;
        let id = self.next_id;
        self.messages.push(Message { id, text, sender, sources });
        id
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
}
