//! # Input Validator
//!
//! Declares which inputs each pipeline step needs and checks collected
//! data against them. Validation failures are data, never errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SetupStep;

/// Policy for an unset optional field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Fill from a business-type-keyed lookup table
    GenerateDefault,
    /// Derive from already-collected fields (see `depends_on`)
    InferFromContext,
    #[default]
    None,
}

/// One input a pipeline step cares about.
#[derive(Debug, Clone, Serialize)]
pub struct InputRequirement {
    pub field: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub fallback: FallbackStrategy,
    /// Whether the model may draft this value for the user
    pub ai_can_generate: bool,
    /// Fields that must hold values before inference is attempted
    pub depends_on: &'static [&'static str],
}

impl InputRequirement {
    const fn required(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            required: true,
            fallback: FallbackStrategy::None,
            ai_can_generate: false,
            depends_on: &[],
        }
    }

    const fn optional(
        field: &'static str,
        label: &'static str,
        fallback: FallbackStrategy,
    ) -> Self {
        Self {
            field,
            label,
            required: false,
            fallback,
            ai_can_generate: false,
            depends_on: &[],
        }
    }

    const fn with_depends(mut self, depends_on: &'static [&'static str]) -> Self {
        self.depends_on = depends_on;
        self
    }

    const fn generatable(mut self) -> Self {
        self.ai_can_generate = true;
        self
    }
}

/// Requirements per step, in the order they are asked.
pub fn requirements_for(step: SetupStep) -> &'static [InputRequirement] {
    const DISCOVERY: &[InputRequirement] = &[
        InputRequirement::required("business_type", "What kind of business is this?"),
        InputRequirement::required("business_name", "What is the business called?"),
        InputRequirement::optional(
            "business_description",
            "Describe the business in a sentence or two",
            FallbackStrategy::None,
        )
        .generatable(),
    ];
    const BUSINESS_INFO: &[InputRequirement] = &[
        InputRequirement::optional(
            "target_audience",
            "Who is the site for?",
            FallbackStrategy::InferFromContext,
        )
        .with_depends(&["business_type"]),
        InputRequirement::optional(
            "tagline",
            "A short tagline for the hero section",
            FallbackStrategy::GenerateDefault,
        )
        .generatable(),
        InputRequirement::optional(
            "contact_email",
            "Where should inquiries go?",
            FallbackStrategy::None,
        ),
    ];
    const BRANDING: &[InputRequirement] = &[
        InputRequirement::required("primary_color", "Pick a primary brand color"),
        InputRequirement::optional(
            "secondary_color",
            "Secondary color",
            FallbackStrategy::InferFromContext,
        )
        .with_depends(&["primary_color"]),
        InputRequirement::optional(
            "accent_color",
            "Accent color",
            FallbackStrategy::InferFromContext,
        )
        .with_depends(&["primary_color"]),
        InputRequirement::optional(
            "heading_font",
            "Heading font",
            FallbackStrategy::GenerateDefault,
        ),
        InputRequirement::optional("body_font", "Body font", FallbackStrategy::GenerateDefault),
    ];
    const STRUCTURE: &[InputRequirement] = &[
        InputRequirement::optional(
            "sections",
            "Which sections should the page have?",
            FallbackStrategy::GenerateDefault,
        ),
        InputRequirement::optional(
            "site_goals",
            "What should the site achieve?",
            FallbackStrategy::GenerateDefault,
        ),
    ];
    const REVIEW: &[InputRequirement] = &[];

    match step {
        SetupStep::Discovery => DISCOVERY,
        SetupStep::BusinessInfo => BUSINESS_INFO,
        SetupStep::Branding => BRANDING,
        SetupStep::Structure => STRUCTURE,
        SetupStep::Review => REVIEW,
    }
}

/// Outcome of validating one step. `valid` iff no required field is
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub missing_required: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn validate(step: SetupStep, data: &BTreeMap<String, String>) -> ValidationResult {
        let mut missing_required = Vec::new();
        let mut errors = Vec::new();

        for req in requirements_for(step) {
            let held = data.get(req.field).map(|v| !v.trim().is_empty()).unwrap_or(false);
            if req.required && !held {
                missing_required.push(req.field.to_string());
                errors.push(format!("Missing required input: {}", req.label));
            }
        }

        ValidationResult {
            valid: missing_required.is_empty(),
            missing_required,
            errors,
        }
    }

    /// Fields of `step` that currently hold no value.
    pub fn missing_fields(
        step: SetupStep,
        data: &BTreeMap<String, String>,
    ) -> Vec<&'static InputRequirement> {
        requirements_for(step)
            .iter()
            .filter(|req| {
                data.get(req.field)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_requires_type_and_name() {
        let mut data = BTreeMap::new();
        let result = InputValidator::validate(SetupStep::Discovery, &data);
        assert!(!result.valid);
        assert_eq!(
            result.missing_required,
            vec!["business_type".to_string(), "business_name".to_string()]
        );

        data.insert("business_type".to_string(), "bakery".to_string());
        data.insert("business_name".to_string(), "Crumb & Co".to_string());
        let result = InputValidator::validate(SetupStep::Discovery, &data);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let mut data = BTreeMap::new();
        data.insert("business_type".to_string(), "   ".to_string());
        let result = InputValidator::validate(SetupStep::Discovery, &data);
        assert!(result
            .missing_required
            .contains(&"business_type".to_string()));
    }

    #[test]
    fn test_optional_fields_never_block() {
        let mut data = BTreeMap::new();
        data.insert("primary_color".to_string(), "#336699".to_string());
        let result = InputValidator::validate(SetupStep::Branding, &data);
        assert!(result.valid);

        // But they still show up as missing for fallback handling
        let missing = InputValidator::missing_fields(SetupStep::Branding, &data);
        assert!(missing.iter().any(|r| r.field == "secondary_color"));
    }
}
