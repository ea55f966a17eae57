use serde::{Deserialize, Serialize};

use crate::ai::{HistoryEntry, Role};

/// Who said a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

/// One line of the visible chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Speaker,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Speaker::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Speaker::Ai,
            text: text.into(),
        }
    }
}

/// Something observers of a speech room may want to render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A message was added at `index`
    MessageAppended { index: usize, message: ChatMessage },
    /// The in-progress AI message at `index` now reads `text`
    MessageUpdated { index: usize, text: String },
    /// The analysis flagged signs of distress in the child's utterance
    Distress { utterance: String },
    /// A speech-capture problem the child should see
    CaptureHint { message: String },
    /// Clip `seq` started playing; its audio is available to clients
    ClipReady {
        seq: u64,
        text: String,
        duration_ms: u64,
    },
}

/// Append-only chat transcript
///
/// Only the most recent AI message is ever rewritten, while its reply streams in.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Append streamed text; returns the full text so far
    pub fn append(&mut self, index: usize, fragment: &str) -> Option<&str> {
        let message = self.messages.get_mut(index)?;
        message.text.push_str(fragment);
        Some(&message.text)
    }

    pub fn replace(&mut self, index: usize, text: impl Into<String>) -> bool {
        match self.messages.get_mut(index) {
            Some(message) => {
                message.text = text.into();
                true
            }
            None => false,
        }
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

    /// History in the shape the text generator expects, blank messages dropped
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter(|m| !m.text.trim().is_empty())
            .map(|m| HistoryEntry {
                text: m.text.clone(),
                role: match m.sender {
                    Speaker::User => Role::User,
                    Speaker::Ai => Role::Model,
                },
            })
            .collect()
    }
}
