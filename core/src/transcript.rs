use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// One project's conversation: an append-only message log plus the research flag.
#[derive(Debug, Clone)]
pub struct Transcript {
    name: String,
    created_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    research_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub research_mode: bool,
}

impl Transcript {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            messages: Vec::new(),
            research_mode: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn research_mode(&self) -> bool {
        self.research_mode
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }

    /// Snapshot of the log. Later appends or a `clear` never show up in the returned vector.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn summary(&self) -> TranscriptSummary {
        TranscriptSummary {
            name: self.name.clone(),
            created_at: self.created_at,
            message_count: self.message_count(),
            research_mode: self.research_mode,
        }
    }

    pub fn toggle_research_mode(&mut self) {
        self.research_mode = !self.research_mode;
    }

    pub fn last_message(&self) -> Option<ChatMessage> {
        self.messages.last().cloned()
    }
}
