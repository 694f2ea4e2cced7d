//! # Sitewright Core
//!
//! The "Brain" of the Sitewright website builder - everything that turns a
//! natural-language chat command into validated, atomically-applied
//! mutations of the site-content model.
//!
//! ## Architecture
//!
//! - `capabilities/` - static action catalog and the advisory matcher
//! - `prompt` - deterministic system-prompt assembly
//! - `pipeline/` - the stepwise onboarding state machine
//! - `actions/` - typed tool calls and the site-state executor
//! - `providers/` - normalized LLM adapters and the retry/fallback router
//! - `memory/` - tiered persistent memory (user / project / session)
//! - `state/` - the site-content model and the SQLite persistence layer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sitewright_core::command::{CommandRequest, CommandService};
//!
//! let service = CommandService::new(registry, router, repo, db);
//! let response = service.handle(&request, &user_ctx).await?;
//! ```

pub mod actions;
pub mod capabilities;
pub mod command;
pub mod error;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod state;
