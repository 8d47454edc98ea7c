//! Context building for assistant prompts
//!
//! Combines:
//! - Recent turns (sliding window)
//! - Older turns ranked by lexical relevance to the query
//! - The learned user profile

mod bundle;
pub mod ranker;

pub use bundle::ContextBundle;
pub use ranker::rank;
