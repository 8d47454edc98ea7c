//! Shared test utilities

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;
use voice_recall::{MemoryConfig, MemoryService, MemoryStore, Role};

/// Set up an in-memory test store
#[must_use]
pub fn setup_store() -> MemoryStore {
    MemoryStore::open_in_memory().expect("failed to init test store")
}

/// Set up a service over an in-memory store
#[must_use]
pub fn setup_service(max_history_length: usize, relevant_limit: usize) -> MemoryService {
    MemoryService::new(
        setup_store(),
        MemoryConfig {
            max_history_length,
            relevant_limit,
        },
    )
    .expect("failed to create test service")
}

/// Temporary directory holding an on-disk database
pub struct TempDb {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TempDb {
    /// Create a fresh temp directory; the database file is not created yet
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("memory.db");
        Self { dir, path }
    }

    /// Open (or reopen) the store at this path
    #[must_use]
    pub fn open(&self) -> MemoryStore {
        MemoryStore::open(&self.path).expect("failed to open on-disk store")
    }
}

/// Ingest `pairs` user/assistant exchanges numbered from 1
pub fn ingest_pairs(service: &MemoryService, pairs: usize) {
    for i in 1..=pairs {
        service
            .ingest(Role::User, &format!("pregunta número {i}"))
            .expect("failed to ingest user turn");
        service
            .ingest(Role::Assistant, &format!("respuesta número {i}"))
            .expect("failed to ingest assistant turn");
    }
}
