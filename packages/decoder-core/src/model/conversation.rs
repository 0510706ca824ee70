//! Conversation transcripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single attributed line of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Speaker label ("Speaker 1", a name, ...)
    pub speaker: String,
    /// Exact message text
    pub text: String,
    /// When the message was sent, if the transcript carried it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Speaker attribution confidence (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Message {
    /// Create a message with no timestamp or confidence
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            timestamp: None,
            confidence: None,
        }
    }
}

/// A pasted conversation and its analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier
    pub id: String,
    /// Optional user-facing title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Messages in transcript order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Speakers identified in the transcript
    #[serde(default)]
    pub speakers: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time (drives list ordering)
    pub updated_at: DateTime<Utc>,
    /// Opaque analysis payload from the analysis service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
}

impl Conversation {
    /// Create an empty conversation with a fresh id
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create an empty conversation with the given id
    pub fn with_id(id: impl Into<String>) -> Self {
        let now = crate::time::now();
        Self {
            id: id.into(),
            title: None,
            messages: Vec::new(),
            speakers: Vec::new(),
            created_at: now,
            updated_at: now,
            analysis: None,
        }
    }

    /// Append a message, registering its speaker and bumping `updated_at`
    pub fn push_message(&mut self, message: Message) {
        if !self.speakers.iter().any(|s| s == &message.speaker) {
            self.speakers.push(message.speaker.clone());
        }
        self.messages.push(message);
        self.touch();
    }

    /// Attach an analysis result and bump `updated_at`
    pub fn set_analysis(&mut self, analysis: serde_json::Value) {
        self.analysis = Some(analysis);
        self.touch();
    }

    /// Mark the conversation as modified now
    pub fn touch(&mut self) {
        self.updated_at = crate::time::now();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
