//! Chat orchestration: retrieval, the language model call, and fallback.
//!
//! Each turn goes through exactly one of two paths:
//!
//! ```text
//! message ─▶ search(top-K) ─▶ system prompt ─▶ ChatModel::complete
//!                                                 │ Ok   → AI reply, history updated
//!                                                 │ Err  → fallback reply, history untouched
//! ```
//!
//! The fallback path never calls the model again and the AI path never
//! consults the fallback topics.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use handbook_core::fallback::fallback_response;
use handbook_core::knowledge::KnowledgeBase;
use handbook_core::prompt::{extract_regulations, system_prompt};
use handbook_core::search::{search, SearchHit};

use crate::ai::{create_chat_model, ChatModel};
use crate::config::{Config, RetrievalConfig};
use crate::conversation::ConversationStore;
use crate::handbook::load_handbook;
use crate::models::{ChatMessage, ChatReply, ChatRequest};

pub const FALLBACK_PROVIDER: &str = "local_fallback";
pub const FALLBACK_MODEL: &str = "handbook_knowledge";
pub const FALLBACK_ERROR: &str = "AI service temporarily unavailable";

/// Client errors raised by [`ChatService::answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    EmptyMessage,
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::EmptyMessage => write!(f, "message must not be empty"),
        }
    }
}

impl std::error::Error for ChatError {}

/// Answers chat turns against a knowledge base and a [`ChatModel`].
pub struct ChatService {
    kb: Arc<KnowledgeBase>,
    model: Arc<dyn ChatModel>,
    conversations: Arc<ConversationStore>,
    retrieval: RetrievalConfig,
}

impl ChatService {
    pub fn new(
        kb: Arc<KnowledgeBase>,
        model: Arc<dyn ChatModel>,
        conversations: Arc<ConversationStore>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            kb,
            model,
            conversations,
            retrieval,
        }
    }

    /// Build a service from configuration: load the handbook and create the
    /// configured model.
    pub fn from_config(config: &Config) -> Result<Self> {
        let kb = load_handbook(config)?;
        let model = create_chat_model(&config.ai)?;
        Ok(Self::new(
            Arc::new(kb),
            Arc::from(model),
            Arc::new(ConversationStore::new()),
            config.retrieval.clone(),
        ))
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn model(&self) -> &dyn ChatModel {
        self.model.as_ref()
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Rank passages with the configured threshold.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        search(&self.kb, query, limit, self.retrieval.min_score)
    }

    /// Answer one chat turn.
    ///
    /// # Errors
    ///
    /// Fails with [`ChatError::EmptyMessage`] when the message is empty after
    /// trimming. Model failures are not errors: they produce a fallback reply.
    pub async fn answer(&self, request: ChatRequest) -> Result<ChatReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage.into());
        }

        let conversation_id = match non_empty(request.session_id)
            .or_else(|| non_empty(request.conversation_id))
        {
            Some(id) => {
                self.conversations.ensure(&id);
                id
            }
            None => self.conversations.create(),
        };

        let context = self.search(message, self.retrieval.context_limit);
        tracing::info!(
            conversation_id = %conversation_id,
            message_chars = message.chars().count(),
            context_items = context.len(),
            "processing chat request"
        );

        let mut messages = vec![ChatMessage::system(system_prompt(&context))];
        messages.extend(self.conversations.history(&conversation_id));
        messages.push(ChatMessage::user(message));

        match self.model.complete(&messages).await {
            Ok(text) => {
                self.conversations
                    .append(&conversation_id, ChatMessage::user(message));
                self.conversations
                    .append(&conversation_id, ChatMessage::assistant(text.clone()));

                Ok(ChatReply {
                    message: text,
                    conversation_id,
                    regulations: extract_regulations(&context, self.retrieval.regulations_limit),
                    faqs: Vec::new(),
                    provider: self.model.provider().to_string(),
                    model: self.model.model().to_string(),
                    ai_powered: true,
                    fallback: false,
                    error: None,
                    timestamp: Utc::now(),
                })
            }
            Err(e) => {
                let fallback = fallback_response(&self.kb, message);
                tracing::warn!(
                    error = %e,
                    topic = fallback.topic.as_deref().unwrap_or("default"),
                    "AI service error, using fallback"
                );
                Ok(ChatReply {
                    message: fallback.text,
                    conversation_id,
                    regulations: Vec::new(),
                    faqs: Vec::new(),
                    provider: FALLBACK_PROVIDER.to_string(),
                    model: FALLBACK_MODEL.to_string(),
                    ai_powered: false,
                    fallback: true,
                    error: Some(FALLBACK_ERROR.to_string()),
                    timestamp: Utc::now(),
                })
            }
        }
    }
}

fn non_empty(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.trim().is_empty())
}

/// CLI entry point for `handbook ask`.
pub async fn run_ask(config: &Config, message: &str) -> Result<()> {
    let service = ChatService::from_config(config)?;
    let reply = service
        .answer(ChatRequest {
            message: message.to_string(),
            ..Default::default()
        })
        .await?;

    println!("{}", reply.message);
    println!();
    println!(
        "-- {} / {}{}",
        reply.provider,
        reply.model,
        if reply.fallback { " (fallback)" } else { "" }
    );
    for reg in &reply.regulations {
        println!("   [{}] {}", reg.title, reg.excerpt);
    }
    Ok(())
}
