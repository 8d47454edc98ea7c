//! Conversation turn runner
//!
//! One call per transcribed utterance: commands are answered directly,
//! everything else goes through memory and the language model.

use tracing::{info, warn};

use super::llm::LanguageModel;
use super::speech::clean_for_speech;
use crate::Result;
use crate::context::ContextBundle;
use crate::db::Role;
use crate::service::{CommandResult, MemoryService};

const MEMORY_UNAVAILABLE_REPLY: &str =
    "Lo siento, ahora mismo no puedo acceder a mi memoria. Inténtalo de nuevo.";

/// Reply produced for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text to hand to speech synthesis
    pub spoken: String,
    /// Whether the utterance was a memory command
    pub command: bool,
}

/// Drives memory and the language model for a conversation
#[derive(Debug)]
pub struct ChatLoop<M> {
    memory: MemoryService,
    model: M,
}

impl<M: LanguageModel> ChatLoop<M> {
    /// Create a loop over `memory` and `model`
    #[must_use]
    pub const fn new(memory: MemoryService, model: M) -> Self {
        Self { memory, model }
    }

    /// Memory service used by the loop
    #[must_use]
    pub const fn memory(&self) -> &MemoryService {
        &self.memory
    }

    /// Language model used by the loop
    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Handle one utterance
    ///
    /// Returns `Ok(None)` for blank input. Memory failures never end the
    /// conversation: they are logged and the turn is answered without
    /// persisted context.
    ///
    /// # Errors
    ///
    /// Returns error only if the language model call fails
    pub async fn handle_utterance(&self, text: &str) -> Result<Option<Reply>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        match self.memory.handle_command(text) {
            Ok(CommandResult::NotACommand) => {}
            Ok(result) => {
                let spoken = result.spoken_reply().unwrap_or_default();
                return Ok(Some(Reply {
                    spoken,
                    command: true,
                }));
            }
            Err(e) => {
                warn!(error = %e, "memory command failed");
                return Ok(Some(Reply {
                    spoken: MEMORY_UNAVAILABLE_REPLY.to_string(),
                    command: true,
                }));
            }
        }

        // Context is built before the user turn is stored so the current
        // message is not repeated inside the history.
        let context = self.memory.build_context(text).unwrap_or_else(|e| {
            warn!(error = %e, "failed to build context, continuing without memory");
            ContextBundle::default()
        });

        if let Err(e) = self.memory.ingest(Role::User, text) {
            warn!(error = %e, "failed to record user turn");
        }

        let prompt = context.format_prompt(text);
        let response = self.model.complete(&prompt).await?;

        if let Err(e) = self.memory.ingest(Role::Assistant, &response) {
            warn!(error = %e, "failed to record assistant turn");
        }

        info!(
            recent = context.recent_turns.len(),
            relevant = context.relevant_turns.len(),
            "answered utterance"
        );

        Ok(Some(Reply {
            spoken: clean_for_speech(&response),
            command: false,
        }))
    }
}
