//! Conversation turns and their row-level queries

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::{Error, Result};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_str_value(&s.trim().to_lowercase())
            .ok_or_else(|| Error::Validation(format!("unknown role: {s}")))
    }
}

/// One recorded utterance
///
/// Turns are never mutated after insert; they disappear only through an
/// explicit clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// Store-assigned, strictly increasing id
    pub id: i64,
    pub role: Role,
    pub text: String,
    /// Set by the store at insert
    pub timestamp: DateTime<Utc>,
}

const TURN_COLUMNS: &str = "id, role, text, created_at";

fn row_to_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<Turn> {
    Ok(Turn {
        id: row.get(0)?,
        role: Role::from_str_value(&row.get::<_, String>(1)?).unwrap_or(Role::User),
        text: row.get(2)?,
        timestamp: parse_datetime(&row.get::<_, String>(3)?),
    })
}

/// Insert a turn and return it as stored
pub(crate) fn insert(conn: &Connection, role: Role, text: &str) -> Result<Turn> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("turn text must not be empty".to_string()));
    }

    let now = Utc::now();
    conn.execute(
        "INSERT INTO turns (role, text, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![role.as_str(), text, now.to_rfc3339()],
    )?;

    Ok(Turn {
        id: conn.last_insert_rowid(),
        role,
        text: text.to_string(),
        timestamp: now,
    })
}

/// Fetch a single turn
pub(crate) fn get(conn: &Connection, id: i64) -> Result<Option<Turn>> {
    let turn = conn
        .query_row(
            &format!("SELECT {TURN_COLUMNS} FROM turns WHERE id = ?1"),
            [id],
            row_to_turn,
        )
        .optional()?;

    Ok(turn)
}

/// List turns oldest to newest
///
/// `limit` keeps only the most recent matches; `before` keeps turns whose id
/// is strictly lower.
pub(crate) fn list(conn: &Connection, limit: Option<usize>, before: Option<i64>) -> Result<Vec<Turn>> {
    // SQLite treats a negative LIMIT as unbounded
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

    let mut stmt = conn.prepare(&format!(
        "SELECT {TURN_COLUMNS} FROM turns
         WHERE (?1 IS NULL OR id < ?1)
         ORDER BY id DESC LIMIT ?2"
    ))?;

    let mut turns = stmt
        .query_map(rusqlite::params![before, limit], row_to_turn)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    // Reverse to get chronological order
    turns.reverse();
    Ok(turns)
}

/// Count stored turns
pub(crate) fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM turns", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Delete every turn; the id sequence is left untouched
pub(crate) fn clear(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM turns", [])?)
}

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
