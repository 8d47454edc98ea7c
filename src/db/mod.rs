//! Database module for turn log and user profile persistence

pub mod profile;
mod schema;
pub mod store;
pub mod turn;

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::Result;

pub use profile::{Profile, ProfileAttribute, ProfileKey, ProfileValue, ValueKind};
pub use schema::SCHEMA_VERSION;
pub use store::{MemorySnapshot, MemoryStore};
pub use turn::{Role, Turn};

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Pooled database connection
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Applies the busy timeout to every connection handed out by the pool
#[derive(Debug)]
struct BusyTimeout;

impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for BusyTimeout {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.busy_timeout(BUSY_TIMEOUT)
    }
}

/// Initialize the database at `path`, creating it on first use
///
/// Safe to call on an already-initialized database.
///
/// # Errors
///
/// Returns error if database cannot be opened or initialized
pub fn init<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(4)
        .connection_customizer(Box::new(BusyTimeout))
        .build(manager)?;

    // Run migrations on first connection
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    schema::init(&conn)?;

    tracing::info!(version = SCHEMA_VERSION, path = %path.display(), "database initialized");
    Ok(pool)
}

/// Initialize an in-memory database (for testing)
///
/// # Errors
///
/// Returns error if database cannot be initialized
pub fn init_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager)?;

    let conn = pool.get()?;
    schema::init(&conn)?;

    Ok(pool)
}
