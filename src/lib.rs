//! Voice Recall - Conversational memory for voice chat assistants
//!
//! This library provides the memory core of a voice assistant:
//! - Durable turn log and learned user profile (`SQLite`)
//! - Rule-based profile fact extraction from user utterances
//! - Lexical relevance ranking of older turns
//! - Context bundles and spoken memory commands
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Chat Loop                         │
//! │   STT text  →  command?  →  LLM  →  speech text      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Memory Service                       │
//! │   ingest  │  build_context  │  handle_command        │
//! └──────┬──────────────┬──────────────────┬────────────┘
//!        │              │                  │
//! ┌──────▼─────┐ ┌──────▼──────┐ ┌─────────▼───────────┐
//! │ Extractor  │ │   Ranker    │ │    Memory Store     │
//! │ rules      │ │ term overlap│ │ turns  │  profile   │
//! └────────────┘ └─────────────┘ └─────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod extract;
pub mod service;

pub use agent::{ChatCompletionsClient, ChatLoop, LanguageModel, Reply, clean_for_speech};
pub use config::{Config, LlmConfig, MemoryConfig};
pub use context::ContextBundle;
pub use db::{
    DbConn, DbPool, MemorySnapshot, MemoryStore, Profile, ProfileAttribute, ProfileKey,
    ProfileValue, Role, Turn,
};
pub use error::{Error, Result};
pub use extract::{ExtractedFact, FactExtractor, Rule};
pub use service::{Command, CommandResult, MemoryService, MemoryStats};
