//! # State Module
//!
//! The site-content model and the unified SQLite persistence collaborator.

pub mod db;
pub mod site;

pub use db::{ChatMessageRow, MemoryRow, MemoryTier, SitewrightDb};
pub use site::{
    BlockInstance, SectionContent, SectionItem, SectionType, SiteMeta, SiteState, SiteStyles,
};
