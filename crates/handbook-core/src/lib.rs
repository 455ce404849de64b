//! # Handbook Core
//!
//! Runtime-free logic for the handbook assistant: the knowledge base, the
//! lexical relevance scorer and search, system prompt construction, and the
//! canned fallback answers used when no language model is reachable.
//!
//! This crate has no tokio, HTTP, or filesystem dependencies. Everything here
//! is a pure function of its inputs.

pub mod fallback;
pub mod knowledge;
pub mod prompt;
pub mod search;
