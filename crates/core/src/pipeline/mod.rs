//! # Onboarding Pipeline
//!
//! The stepwise state machine that walks a new user through mandatory
//! site-configuration inputs, with default-generation and
//! context-inference fallbacks for the optional ones.

pub mod defaults;
pub mod orchestrator;
pub mod validator;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use orchestrator::{PipelineOrchestrator, StepOutcome};
pub use validator::{
    FallbackStrategy, InputRequirement, InputValidator, ValidationResult,
};

/// Ordered steps of the onboarding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    /// Learn what the business is
    Discovery,
    /// Audience, tagline, contact details
    BusinessInfo,
    /// Colors and fonts
    Branding,
    /// Page sections and site goals
    Structure,
    /// Final confirmation
    Review,
}

impl SetupStep {
    /// All steps in pipeline order.
    pub fn all() -> [SetupStep; 5] {
        [
            SetupStep::Discovery,
            SetupStep::BusinessInfo,
            SetupStep::Branding,
            SetupStep::Structure,
            SetupStep::Review,
        ]
    }

    pub fn first() -> SetupStep {
        SetupStep::Discovery
    }

    /// The following step, or `None` after the last.
    pub fn next(&self) -> Option<SetupStep> {
        match self {
            SetupStep::Discovery => Some(SetupStep::BusinessInfo),
            SetupStep::BusinessInfo => Some(SetupStep::Branding),
            SetupStep::Branding => Some(SetupStep::Structure),
            SetupStep::Structure => Some(SetupStep::Review),
            SetupStep::Review => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SetupStep::Discovery => "Discovery",
            SetupStep::BusinessInfo => "Business Info",
            SetupStep::Branding => "Branding",
            SetupStep::Structure => "Structure",
            SetupStep::Review => "Review",
        }
    }
}

/// Live state of one onboarding session. Not shared across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub current_step: SetupStep,
    /// Monotonically growing; steps are never un-completed
    pub completed_steps: Vec<SetupStep>,
    /// Flat key/value map of collected inputs
    pub data: BTreeMap<String, String>,
    /// Fields the UI still owes the pipeline
    pub pending_inputs: Vec<String>,
    pub errors: Vec<String>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            current_step: SetupStep::first(),
            completed_steps: Vec::new(),
            data: BTreeMap::new(),
            pending_inputs: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl PipelineState {
    pub fn is_completed(&self, step: SetupStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Idempotent: completing a step twice records it once.
    pub fn mark_completed(&mut self, step: SetupStep) {
        if !self.is_completed(step) {
            self.completed_steps.push(step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_advance_in_order() {
        let mut step = SetupStep::first();
        let mut walked = vec![step];
        while let Some(next) = step.next() {
            walked.push(next);
            step = next;
        }
        assert_eq!(walked, SetupStep::all());
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut state = PipelineState::default();
        state.mark_completed(SetupStep::Discovery);
        state.mark_completed(SetupStep::Discovery);
        assert_eq!(state.completed_steps.len(), 1);
    }
}
