//! Memory service: the boundary the chat loop talks to
//!
//! Records turns, learns profile facts from user turns, builds prompt context
//! and handles spoken control commands. All state lives in the store; the
//! service itself only holds configuration.

mod command;

use serde::Serialize;
use tracing::{debug, info};

pub use command::{Command, CommandResult, describe_profile};

use crate::config::MemoryConfig;
use crate::context::{ContextBundle, rank};
use crate::db::{MemoryStore, Role, Turn};
use crate::extract::FactExtractor;
use crate::Result;

/// Counters for the `stats` view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Turns currently in the log
    pub turns: usize,
    /// Profile attributes currently known
    pub profile_attributes: usize,
    /// Configured recent-history window
    pub max_history_length: usize,
}

/// Memory service over one store
#[derive(Debug, Clone)]
pub struct MemoryService {
    store: MemoryStore,
    extractor: FactExtractor,
    config: MemoryConfig,
}

impl MemoryService {
    /// Create a service with the default fact extractor
    ///
    /// # Errors
    ///
    /// Returns a config error if the memory limits are invalid
    pub fn new(store: MemoryStore, config: MemoryConfig) -> Result<Self> {
        Self::with_extractor(store, FactExtractor::default(), config)
    }

    /// Create a service with a custom fact extractor
    ///
    /// # Errors
    ///
    /// Returns a config error if the memory limits are invalid
    pub fn with_extractor(
        store: MemoryStore,
        extractor: FactExtractor,
        config: MemoryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            extractor,
            config,
        })
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Memory limits in effect
    #[must_use]
    pub const fn config(&self) -> MemoryConfig {
        self.config
    }

    /// Record a turn; user turns also update the profile
    ///
    /// Text without recognizable facts is not an error. The turn and the
    /// facts learned from it commit in one transaction: either both are
    /// stored or neither is.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty text or a storage error
    pub fn ingest(&self, role: Role, text: &str) -> Result<Turn> {
        let facts = if role == Role::User {
            self.extractor.extract(text)
        } else {
            Vec::new()
        };
        let count = facts.len();

        let (turn, _) = self.store.append_turn_with_facts(
            role,
            text,
            facts.into_iter().map(|f| (f.key, f.value)).collect(),
        )?;

        if count > 0 {
            info!(turn_id = turn.id, facts = count, "learned profile facts");
        }

        Ok(turn)
    }

    /// Assemble the context for answering `query`
    ///
    /// Recent turns cover the configured window; relevant turns are drawn
    /// only from the turns older than that window. Read-only.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read
    pub fn build_context(&self, query: &str) -> Result<ContextBundle> {
        let snapshot = self.store.snapshot(self.config.max_history_length)?;

        let relevant_turns: Vec<Turn> = rank(query, &snapshot.older, self.config.relevant_limit)
            .into_iter()
            .cloned()
            .collect();

        debug!(
            recent = snapshot.recent.len(),
            relevant = relevant_turns.len(),
            profile = snapshot.profile.len(),
            "built context"
        );

        Ok(ContextBundle {
            recent_turns: snapshot.recent,
            relevant_turns,
            profile: snapshot.profile,
        })
    }

    /// Run `text` as a control command if it is one
    ///
    /// # Errors
    ///
    /// Returns a storage error if a clear or profile read fails; a failed
    /// clear leaves the store unchanged
    pub fn handle_command(&self, text: &str) -> Result<CommandResult> {
        let Some(command) = Command::parse(text) else {
            return Ok(CommandResult::NotACommand);
        };

        info!(?command, "handling memory command");

        match command {
            Command::ClearConversation => {
                self.store.clear_turns()?;
                Ok(CommandResult::ConversationCleared)
            }
            Command::ClearAllMemory => {
                self.store.clear_all()?;
                Ok(CommandResult::MemoryCleared)
            }
            Command::ShowProfile => Ok(CommandResult::Profile(self.store.get_profile()?)),
        }
    }

    /// Rank the whole turn log against `query`, best first
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Turn>> {
        let turns = self.store.list_turns(None, None)?;
        Ok(rank(query, &turns, limit).into_iter().cloned().collect())
    }

    /// Current counters
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read
    pub fn stats(&self) -> Result<MemoryStats> {
        Ok(MemoryStats {
            turns: self.store.turn_count()?,
            profile_attributes: self.store.get_profile()?.len(),
            max_history_length: self.config.max_history_length,
        })
    }
}
