//! Context bundle handed to the language model

use serde::Serialize;

use crate::db::profile::format_profile;
use crate::db::{Profile, Turn};

/// Recent turns, relevant older turns and the profile for one prompt
///
/// Built fresh for every prompt and discarded afterwards; never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextBundle {
    /// Last N turns, oldest first
    pub recent_turns: Vec<Turn>,
    /// Older turns ranked by relevance to the query, best first
    pub relevant_turns: Vec<Turn>,
    /// Full current profile
    pub profile: Profile,
}

impl ContextBundle {
    /// Whether there is nothing to add to the prompt
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recent_turns.is_empty() && self.relevant_turns.is_empty() && self.profile.is_empty()
    }

    /// Format the full prompt: profile, relevant history, recent history and
    /// finally the current message
    #[must_use]
    pub fn format_prompt(&self, current_message: &str) -> String {
        let mut parts = Vec::new();

        if !self.profile.is_empty() {
            parts.push(format!(
                "<user-profile>\n{}\n</user-profile>",
                format_profile(&self.profile)
            ));
        }

        if !self.relevant_turns.is_empty() {
            parts.push(format!(
                "<relevant-history>\n{}\n</relevant-history>",
                format_turns(&self.relevant_turns)
            ));
        }

        if !self.recent_turns.is_empty() {
            parts.push(format!(
                "<conversation-history>\n{}\n</conversation-history>",
                format_turns(&self.recent_turns)
            ));
        }

        parts.push(current_message.to_string());

        parts.join("\n\n")
    }
}

fn format_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("<{}>\n{}\n</{}>", t.role, t.text, t.role))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::{ProfileAttribute, ProfileKey, ProfileValue, Role};

    fn turn(id: i64, role: Role, text: &str) -> Turn {
        Turn {
            id,
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_empty_bundle_is_just_the_message() {
        let bundle = ContextBundle::default();
        assert!(bundle.is_empty());
        assert_eq!(bundle.format_prompt("¿Qué hora es?"), "¿Qué hora es?");
    }

    #[test]
    fn test_json_shape() {
        let bundle = ContextBundle {
            recent_turns: vec![turn(4, Role::Assistant, "¡Hola, Ana!")],
            relevant_turns: Vec::new(),
            profile: Profile::new(),
        };

        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["recent_turns"][0]["id"], 4);
        assert_eq!(json["recent_turns"][0]["role"], "assistant");
        assert_eq!(json["relevant_turns"], serde_json::json!([]));
        assert_eq!(json["profile"], serde_json::json!({}));
    }

    #[test]
    fn test_format_prompt_sections() {
        let mut profile = Profile::new();
        profile.insert(
            ProfileKey::Name,
            ProfileAttribute {
                key: ProfileKey::Name,
                value: ProfileValue::Text("ana".to_string()),
                updated_at: Utc::now(),
            },
        );

        let bundle = ContextBundle {
            recent_turns: vec![
                turn(10, Role::User, "Hola"),
                turn(11, Role::Assistant, "¡Hola, Ana!"),
            ],
            relevant_turns: vec![turn(2, Role::User, "trabajo como doctora")],
            profile,
        };

        let prompt = bundle.format_prompt("¿Recuerdas mi trabajo?");
        assert!(prompt.starts_with("<user-profile>\n- name: Ana\n</user-profile>"));
        assert!(prompt.contains("<relevant-history>\n<user>\ntrabajo como doctora\n</user>\n</relevant-history>"));
        assert!(prompt.contains("<assistant>\n¡Hola, Ana!\n</assistant>"));
        assert!(prompt.ends_with("\n\n¿Recuerdas mi trabajo?"));

        let relevant_at = prompt.find("<relevant-history>").unwrap();
        let recent_at = prompt.find("<conversation-history>").unwrap();
        assert!(relevant_at < recent_at);
    }
}
