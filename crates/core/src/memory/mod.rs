//! # Memory Module
//!
//! Tiered persistent memory for the command orchestrator.
//!
//! ## Architecture
//!
//! ```text
//! UserMemory (per user) + ProjectMemory (per project) + SessionMemory (per session)
//!                      ↓
//!               MemoryRepository
//!                      ↓
//!    SqliteMemoryRepository (persistent) or InMemoryRepository (tests)
//! ```

pub mod context;
pub mod stores;

pub use context::{MemoryContext, MemoryContextBuilder};
pub use stores::{
    modify_project, modify_session, DecisionRecord, InMemoryRepository, MemoryRepository,
    PendingQuestion, ProjectMemory, SessionMemory, SqliteMemoryRepository, TaskRecord, UserMemory,
    Versioned, WipState,
};
