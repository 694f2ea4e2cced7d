//! # Capabilities
//!
//! The static catalog of user-invokable actions and the advisory matcher
//! that scores free-text input against it.

pub mod matcher;
pub mod registry;

pub use matcher::{match_capabilities, CapabilityMatch};
pub use registry::{
    Capability, CapabilityCategory, CapabilityRegistry, CapabilityRequirements, CapabilityStatus,
    PlanTier, UserContext,
};
