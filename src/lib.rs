//! # Handbook Assistant
//!
//! A university handbook chat assistant. Questions are matched against a
//! small in-memory handbook, the best passages are injected into a language
//! model prompt, and canned topic answers stand in whenever the model is
//! unreachable.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ KnowledgeBase │──▶│ search top-K │──▶│ system prompt │
//! └───────┬───────┘   └──────────────┘   └───────┬───────┘
//!         │                                      ▼
//!         │                              ┌───────────────┐
//!         │                    Err ◀─────│   ChatModel   │────▶ Ok: AI reply
//!         ▼                     │        └───────────────┘
//!  ┌──────────────┐             │
//!  │   fallback   │◀────────────┘
//!  └──────────────┘
//! ```
//!
//! The scoring, prompt, and fallback logic lives in the `handbook-core`
//! crate. This crate adds configuration, the language model client,
//! conversation history, the HTTP server, and the `handbook` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! handbook search "補考"          # rank handbook passages
//! handbook ask "補考規定"         # one chat turn (AI or fallback)
//! handbook sections              # list handbook sections
//! handbook serve                 # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Chat data types |
//! | [`ai`] | Language model client abstraction |
//! | [`conversation`] | In-memory conversation history |
//! | [`chat`] | AI-or-fallback chat orchestration |
//! | [`handbook`] | Knowledge base loading and section commands |
//! | [`search`] | Search command |
//! | [`server`] | HTTP API |

pub mod ai;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod handbook;
pub mod models;
pub mod search;
pub mod server;
