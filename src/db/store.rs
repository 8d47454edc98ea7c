//! Durable memory store: turn log plus user profile
//!
//! Every mutation runs inside an immediate transaction, so concurrent writers
//! are serialized by `SQLite` and readers only ever see committed state.
//! Multi-table operations (`clear_all`, `snapshot`) run in a single
//! transaction and are observed as a whole or not at all.

use std::path::Path;

use rusqlite::TransactionBehavior;

use super::profile::{self, Profile, ProfileAttribute, ProfileKey, ProfileValue};
use super::turn::{self, Role, Turn};
use super::{DbConn, DbPool};
use crate::Result;

/// A consistent read of the store for context building
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    /// Most recent turns, oldest first
    pub recent: Vec<Turn>,
    /// Turns older than the recent window, oldest first
    pub older: Vec<Turn>,
    /// Full profile
    pub profile: Profile,
}

/// Memory store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pool: DbPool,
}

impl MemoryStore {
    /// Create a store over an initialized pool
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and create if absent) the store at `path`
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or migrated
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(super::init(path)?))
    }

    /// Open a throwaway in-memory store
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be initialized
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(super::init_memory()?))
    }

    fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Append a turn, assigning the next id and timestamp
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty text, or a storage error if the
    /// database is unwritable
    pub fn append_turn(&self, role: Role, text: &str) -> Result<Turn> {
        let (turn, _) = self.append_turn_with_facts(role, text, Vec::new())?;
        Ok(turn)
    }

    /// Append a turn together with the profile facts learned from it
    ///
    /// The turn and every fact commit in one transaction, so a concurrent
    /// clear sees either none of them or all of them.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty text or an invalid fact, or a
    /// storage error; nothing is written in either case
    pub fn append_turn_with_facts(
        &self,
        role: Role,
        text: &str,
        facts: Vec<(ProfileKey, ProfileValue)>,
    ) -> Result<(Turn, Vec<ProfileAttribute>)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let turn = turn::insert(&tx, role, text)?;
        let attrs = facts
            .into_iter()
            .map(|(key, value)| profile::upsert(&tx, key, value))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        tracing::debug!(id = turn.id, role = %turn.role, "turn appended");
        for attr in &attrs {
            tracing::info!(key = %attr.key, value = %attr.value, "profile attribute updated");
        }
        Ok((turn, attrs))
    }

    /// Look up a turn by id
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get_turn(&self, id: i64) -> Result<Option<Turn>> {
        let conn = self.conn()?;
        turn::get(&conn, id)
    }

    /// List turns oldest to newest
    ///
    /// `limit` caps the result to the most recent matches, `before` keeps only
    /// turns with a lower id.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_turns(&self, limit: Option<usize>, before: Option<i64>) -> Result<Vec<Turn>> {
        let conn = self.conn()?;
        turn::list(&conn, limit, before)
    }

    /// Number of stored turns
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn turn_count(&self) -> Result<usize> {
        let conn = self.conn()?;
        turn::count(&conn)
    }

    /// Set a profile attribute by key name
    ///
    /// # Errors
    ///
    /// Returns a validation error if `key` is outside the vocabulary or the
    /// value does not fit the key's type
    pub fn upsert_profile_attribute(&self, key: &str, value: ProfileValue) -> Result<ProfileAttribute> {
        let key: ProfileKey = key.parse()?;
        let mut attrs = self.upsert_profile_attributes(vec![(key, value)])?;
        Ok(attrs.remove(0))
    }

    /// Set several attributes in one transaction
    ///
    /// Either every attribute is written or none is.
    ///
    /// # Errors
    ///
    /// Returns error if any value is invalid or the database operation fails
    pub fn upsert_profile_attributes(
        &self,
        updates: Vec<(ProfileKey, ProfileValue)>,
    ) -> Result<Vec<ProfileAttribute>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let attrs = updates
            .into_iter()
            .map(|(key, value)| profile::upsert(&tx, key, value))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        for attr in &attrs {
            tracing::info!(key = %attr.key, value = %attr.value, "profile attribute updated");
        }
        Ok(attrs)
    }

    /// Current profile
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get_profile(&self) -> Result<Profile> {
        let conn = self.conn()?;
        profile::load(&conn)
    }

    /// Erase the conversation log; the profile is kept
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails; nothing is erased then
    pub fn clear_turns(&self) -> Result<()> {
        let removed = self.in_write_tx(turn::clear)?;
        tracing::info!(removed, "conversation cleared");
        Ok(())
    }

    /// Erase the profile; turns are kept
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails; nothing is erased then
    pub fn clear_profile(&self) -> Result<()> {
        let removed = self.in_write_tx(profile::clear)?;
        tracing::info!(removed, "profile cleared");
        Ok(())
    }

    /// Erase turns and profile together
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails; nothing is erased then
    pub fn clear_all(&self) -> Result<()> {
        let (turns, attributes) =
            self.in_write_tx(|conn| Ok((turn::clear(conn)?, profile::clear(conn)?)))?;
        tracing::info!(turns, attributes, "all memory cleared");
        Ok(())
    }

    /// Read recent turns, older turns and the profile as one consistent view
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn snapshot(&self, recent_limit: usize) -> Result<MemorySnapshot> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let recent = turn::list(&tx, Some(recent_limit), None)?;
        let older = match recent.first() {
            Some(oldest_recent) => turn::list(&tx, None, Some(oldest_recent.id))?,
            // Empty window: either nothing is stored or the window size is zero
            None if recent_limit == 0 => turn::list(&tx, None, None)?,
            None => Vec::new(),
        };
        let profile = profile::load(&tx)?;
        tx.finish()?;

        Ok(MemorySnapshot {
            recent,
            older,
            profile,
        })
    }

    fn in_write_tx<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&*tx)?;
        tx.commit()?;
        Ok(out)
    }
}
