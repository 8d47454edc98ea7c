//! Profile fact extraction from free-text utterances
//!
//! An ordered list of independent recognizer rules, each tied to one profile
//! key. Every rule runs against the whole utterance and all matches are
//! returned. When several rules yield the same key, the rule that comes
//! later in the list wins; the fact keeps the position of the first match.

mod rules;

use regex::Regex;

use crate::db::{ProfileKey, ProfileValue};

pub use rules::default_rules;

/// A profile update recognized in an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub key: ProfileKey,
    pub value: ProfileValue,
}

/// A single recognizer: a pattern whose first capture group is the value
#[derive(Clone)]
pub struct Rule {
    key: ProfileKey,
    pattern: Regex,
    guard: Option<fn(&str) -> bool>,
}

impl Rule {
    /// Create a rule from a regex whose first capture group holds the value
    ///
    /// Patterns run against lowercased text.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is not a valid regex
    pub fn new(key: ProfileKey, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            key,
            pattern: Regex::new(pattern)?,
            guard: None,
        })
    }

    /// Only accept captures for which `guard` returns true
    #[must_use]
    pub const fn with_guard(mut self, guard: fn(&str) -> bool) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Key this rule produces
    #[must_use]
    pub const fn key(&self) -> ProfileKey {
        self.key
    }

    /// Run the rule against already-lowercased text
    ///
    /// Tries every match in order and returns the first accepted one.
    #[must_use]
    pub fn recognize(&self, lowered: &str) -> Option<ProfileValue> {
        self.pattern.captures_iter(lowered).find_map(|caps| {
            let raw = caps.get(1)?.as_str().trim();
            if self.guard.is_some_and(|guard| !guard(raw)) {
                return None;
            }
            ProfileValue::parse_for(self.key, raw).ok()
        })
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("key", &self.key)
            .field("pattern", &self.pattern.as_str())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Applies an ordered rule list to utterances
#[derive(Debug, Clone)]
pub struct FactExtractor {
    rules: Vec<Rule>,
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl FactExtractor {
    /// Create an extractor over `rules`, in priority order
    #[must_use]
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Append a rule; it takes precedence over existing rules for its key
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in priority order
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Extract profile facts from `text`
    ///
    /// Never fails; text with no recognizable self-statement yields an empty
    /// list.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<ExtractedFact> {
        let lowered = text.to_lowercase();
        let mut facts: Vec<ExtractedFact> = Vec::new();

        for rule in &self.rules {
            let Some(value) = rule.recognize(&lowered) else {
                continue;
            };

            match facts.iter_mut().find(|f| f.key == rule.key) {
                Some(existing) => existing.value = value,
                None => facts.push(ExtractedFact {
                    key: rule.key,
                    value,
                }),
            }
        }

        if !facts.is_empty() {
            tracing::debug!(count = facts.len(), "extracted profile facts");
        }

        facts
    }
}
