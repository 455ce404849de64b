//! Data types shared by the chat service, the AI client, and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use handbook_core::prompt::Regulation;

/// Speaker of a chat turn, serialized the way chat-completion APIs expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn sent to, or received from, the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Inputs for a single chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    /// Client session id. Takes precedence over `conversation_id`.
    pub session_id: Option<String>,
    pub conversation_id: Option<String>,
}

/// A frequently asked question attached to a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
    pub category: String,
}

/// The answer to one chat turn, from either the language model or the
/// fallback generator.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub conversation_id: String,
    pub regulations: Vec<Regulation>,
    pub faqs: Vec<Faq>,
    pub provider: String,
    pub model: String,
    pub ai_powered: bool,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}
