//! Learned user profile: closed key vocabulary and row-level queries

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use super::turn::parse_datetime;
use crate::{Error, Result};

/// Oldest age accepted for the `age` attribute
const MAX_AGE: i64 = 150;

/// Profile attribute keys
///
/// The set is closed: adding an attribute means adding a variant here and a
/// matching recognizer rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKey {
    Name,
    Age,
    Profession,
    Location,
}

/// Declared value type of a profile key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
}

impl ProfileKey {
    /// Every key in the vocabulary
    pub const ALL: [Self; 4] = [Self::Name, Self::Age, Self::Profession, Self::Location];

    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::Profession => "profession",
            Self::Location => "location",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "name" => Some(Self::Name),
            "age" => Some(Self::Age),
            "profession" => Some(Self::Profession),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    /// Value type this key accepts
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Age => ValueKind::Integer,
            Self::Name | Self::Profession | Self::Location => ValueKind::Text,
        }
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_value(&s.trim().to_lowercase())
            .ok_or_else(|| Error::Validation(format!("unknown profile key: {s}")))
    }
}

/// A profile value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Text(String),
    Integer(i64),
}

impl ProfileValue {
    /// Value type of this value
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Integer(_) => ValueKind::Integer,
        }
    }

    /// Parse raw input according to the key's declared type
    ///
    /// # Errors
    ///
    /// Returns a validation error if `raw` is not a valid value for `key`
    pub fn parse_for(key: ProfileKey, raw: &str) -> Result<Self> {
        let value = match key.kind() {
            ValueKind::Text => Self::Text(raw.to_string()),
            ValueKind::Integer => Self::Integer(raw.trim().parse().map_err(|_| {
                Error::Validation(format!("{key} expects an integer, got {raw:?}"))
            })?),
        };
        value.normalized_for(key)
    }

    /// Check the value against `key` and normalize it for storage
    ///
    /// Text is trimmed and lowercased; display casing is restored by
    /// [`fmt::Display`].
    fn normalized_for(self, key: ProfileKey) -> Result<Self> {
        if self.kind() != key.kind() {
            return Err(Error::Validation(format!(
                "{key} expects {:?}, got {:?}",
                key.kind(),
                self.kind()
            )));
        }

        match self {
            Self::Text(text) => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
                if text.is_empty() {
                    return Err(Error::Validation(format!("{key} must not be empty")));
                }
                Ok(Self::Text(text))
            }
            Self::Integer(n) if key == ProfileKey::Age && !(0..=MAX_AGE).contains(&n) => {
                Err(Error::Validation(format!("age out of range: {n}")))
            }
            Self::Integer(n) => Ok(Self::Integer(n)),
        }
    }

    fn to_storage(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(n) => n.to_string(),
        }
    }

    fn from_storage(kind: ValueKind, raw: String) -> Self {
        match kind {
            ValueKind::Integer => raw.parse().map_or(Self::Text(raw), Self::Integer),
            ValueKind::Text => Self::Text(raw),
        }
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(text) => {
                let words: Vec<String> = text
                    .split(' ')
                    .map(|word| {
                        let mut chars = word.chars();
                        chars.next().map_or_else(String::new, |first| {
                            first.to_uppercase().chain(chars).collect()
                        })
                    })
                    .collect();
                f.write_str(&words.join(" "))
            }
        }
    }
}

/// A learned fact about the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileAttribute {
    pub key: ProfileKey,
    pub value: ProfileValue,
    pub updated_at: DateTime<Utc>,
}

/// The full profile, keyed by attribute
pub type Profile = BTreeMap<ProfileKey, ProfileAttribute>;

/// Insert or overwrite a profile attribute
///
/// `updated_at` always moves forward, even when two writes land within the
/// clock's resolution.
pub(crate) fn upsert(conn: &Connection, key: ProfileKey, value: ProfileValue) -> Result<ProfileAttribute> {
    let value = value.normalized_for(key)?;

    let previous: Option<String> = conn
        .query_row(
            "SELECT updated_at FROM profile WHERE key = ?1",
            [key.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    let mut now = Utc::now();
    if let Some(previous) = previous.as_deref().map(parse_datetime) {
        if now <= previous {
            now = previous + Duration::microseconds(1);
        }
    }

    conn.execute(
        "INSERT INTO profile (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
        rusqlite::params![key.as_str(), value.to_storage(), now.to_rfc3339()],
    )?;

    Ok(ProfileAttribute {
        key,
        value,
        updated_at: now,
    })
}

/// Load every stored attribute
pub(crate) fn load(conn: &Connection) -> Result<Profile> {
    let mut stmt = conn.prepare("SELECT key, value, updated_at FROM profile ORDER BY key")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let profile = rows
        .into_iter()
        .filter_map(|(key, value, updated_at)| {
            let Some(key) = ProfileKey::from_str_value(&key) else {
                tracing::warn!(key, "ignoring profile row outside the vocabulary");
                return None;
            };
            Some((
                key,
                ProfileAttribute {
                    key,
                    value: ProfileValue::from_storage(key.kind(), value),
                    updated_at: parse_datetime(&updated_at),
                },
            ))
        })
        .collect();

    Ok(profile)
}

/// Delete every attribute
pub(crate) fn clear(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM profile", [])?)
}

/// Format a profile for prompt injection or display
#[must_use]
pub fn format_profile(profile: &Profile) -> String {
    profile
        .values()
        .map(|attr| format!("- {}: {}", attr.key, attr.value))
        .collect::<Vec<_>>()
        .join("\n")
}
