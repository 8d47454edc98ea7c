//! Spoken control commands
//!
//! A command is recognized only when the whole utterance is one of the known
//! phrases. Case, accents, punctuation and extra whitespace are ignored, so
//! "¡Borrar memoria!" and "borrar   MEMORIA" are the same command.

use serde::Serialize;

use crate::context::ranker::fold_accents;
use crate::db::{Profile, ProfileKey, ProfileValue};

/// A recognized control command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Erase the turn log, keep the profile
    ClearConversation,
    /// Erase the turn log and the profile
    ClearAllMemory,
    /// Read back the profile without changing anything
    ShowProfile,
}

/// Phrase table; every phrase is already normalized
const PHRASES: &[(Command, &[&str])] = &[
    (
        Command::ClearConversation,
        &[
            "borrar conversacion",
            "limpiar conversacion",
            "nueva conversacion",
            "olvida la conversacion",
            "clear conversation",
            "new conversation",
            "reset conversation",
        ],
    ),
    (
        Command::ClearAllMemory,
        &[
            "borrar memoria",
            "limpiar memoria",
            "resetear memoria",
            "borrar todo",
            "olvida todo",
            "clear memory",
            "reset memory",
            "forget everything",
        ],
    ),
    (
        Command::ShowProfile,
        &[
            "mostrar perfil",
            "mi perfil",
            "perfil usuario",
            "ver perfil",
            "show profile",
            "my profile",
        ],
    ),
];

impl Command {
    /// Recognize a spoken phrase
    ///
    /// Returns `None` when the text is not exactly one of the known phrases.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return None;
        }

        PHRASES
            .iter()
            .find(|(_, phrases)| phrases.contains(&normalized.as_str()))
            .map(|(command, _)| *command)
    }
}

fn normalize(text: &str) -> String {
    fold_accents(&text.to_lowercase())
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of [`MemoryService::handle_command`](super::MemoryService::handle_command)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "profile", rename_all = "snake_case")]
pub enum CommandResult {
    /// The text is an ordinary chat message
    NotACommand,
    /// Turn log erased
    ConversationCleared,
    /// Turn log and profile erased
    MemoryCleared,
    /// Current profile, unchanged
    Profile(Profile),
}

impl CommandResult {
    /// Whether the text was handled as a command
    #[must_use]
    pub const fn is_command(&self) -> bool {
        !matches!(self, Self::NotACommand)
    }

    /// Reply to speak back to the user, if the text was a command
    #[must_use]
    pub fn spoken_reply(&self) -> Option<String> {
        match self {
            Self::NotACommand => None,
            Self::ConversationCleared => {
                Some("He borrado la conversación. Empezamos de nuevo.".to_string())
            }
            Self::MemoryCleared => Some(
                "He borrado la memoria de nuestra conversación. Empezamos de nuevo.".to_string(),
            ),
            Self::Profile(profile) => Some(describe_profile(profile)),
        }
    }
}

/// Describe the profile as a sentence suitable for speech
#[must_use]
pub fn describe_profile(profile: &Profile) -> String {
    if profile.is_empty() {
        return "Aún no tengo información guardada sobre ti. Cuéntame algo sobre ti.".to_string();
    }

    let parts: Vec<String> = profile
        .values()
        .map(|attr| match (attr.key, &attr.value) {
            (ProfileKey::Name, value) => format!("tu nombre es {value}"),
            (ProfileKey::Age, value) => format!("tienes {value} años"),
            (ProfileKey::Profession, ProfileValue::Text(text)) => format!("trabajas como {text}"),
            (ProfileKey::Location, value) => format!("vives en {value}"),
            (key, value) => format!("tu {key} es {value}"),
        })
        .collect();

    format!("Lo que sé sobre ti: {}.", parts.join(", "))
}
