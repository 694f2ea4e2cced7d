//! # Site Actions
//!
//! Typed payloads for every tool the model can call, plus parsing from the
//! untyped wire shape. Arguments are validated here, at the boundary, so
//! the executor only ever sees well-formed actions.

pub mod executor;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::providers::ToolDefinition;
use crate::state::{SectionItem, SectionType};

pub use executor::ActionExecutor;

/// A named action with raw arguments, as emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Result of applying one action. Always a value - the executor never
/// lets an error escape as a panic or an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(action: &str, description: impl Into<String>) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            description: description.into(),
            changes: None,
            error: None,
        }
    }

    pub fn ok_with_changes(
        action: &str,
        description: impl Into<String>,
        changes: serde_json::Value,
    ) -> Self {
        Self {
            changes: Some(changes),
            ..Self::ok(action, description)
        }
    }

    pub fn failed(action: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            action: action.to_string(),
            description: format!("{} failed", action),
            changes: None,
            error: Some(error),
        }
    }
}

/// Where `add_section` inserts the new section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    Start,
    #[default]
    End,
    /// After the first hero section. With no hero present the computed
    /// index is 0, so the section lands at the top (see DESIGN.md).
    AfterHero,
    /// Before the first contact section, appended when there is none
    BeforeContact,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddSectionArgs {
    pub section_type: SectionType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<SectionItem>>,
    #[serde(default)]
    pub position: InsertPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RemoveSectionArgs {
    /// Section id, preferred over type lookup when both are present
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub section_type: Option<SectionType>,
}

/// Fields to merge into an existing section. Absent fields stay untouched.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SectionUpdates {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<SectionItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditSectionArgs {
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub section_type: Option<SectionType>,
    pub updates: SectionUpdates,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReorderSectionsArgs {
    /// Ids in the desired order; sections not listed keep their relative
    /// order after the listed ones
    pub order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColorsArgs {
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFontsArgs {
    #[serde(default)]
    pub heading_font: Option<String>,
    #[serde(default)]
    pub body_font: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct UpdateSeoArgs {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Every action the executor knows, with typed payloads.
#[derive(Debug, Clone)]
pub enum SiteAction {
    AddSection(AddSectionArgs),
    RemoveSection(RemoveSectionArgs),
    EditSection(EditSectionArgs),
    ReorderSections(ReorderSectionsArgs),
    UpdateColors(UpdateColorsArgs),
    UpdateFonts(UpdateFontsArgs),
    UpdateSeo(UpdateSeoArgs),
    GetSiteInfo,
}

/// Why a tool call could not be turned into a `SiteAction`.
#[derive(Debug)]
pub enum ParseActionError {
    /// The name matches no known action
    Unknown,
    /// The name is known but the arguments are malformed
    InvalidArguments(String),
}

impl SiteAction {
    /// Validate a raw tool call into a typed action.
    pub fn parse(call: &ToolCall) -> Result<SiteAction, ParseActionError> {
        fn args<T: serde::de::DeserializeOwned>(
            value: &serde_json::Value,
        ) -> Result<T, ParseActionError> {
            serde_json::from_value(value.clone())
                .map_err(|e| ParseActionError::InvalidArguments(e.to_string()))
        }

        match call.name.as_str() {
            "add_section" => Ok(SiteAction::AddSection(args(&call.arguments)?)),
            "remove_section" => Ok(SiteAction::RemoveSection(args(&call.arguments)?)),
            "edit_section" => Ok(SiteAction::EditSection(args(&call.arguments)?)),
            "reorder_sections" => Ok(SiteAction::ReorderSections(args(&call.arguments)?)),
            "update_colors" => Ok(SiteAction::UpdateColors(args(&call.arguments)?)),
            "update_fonts" => Ok(SiteAction::UpdateFonts(args(&call.arguments)?)),
            "update_seo" => Ok(SiteAction::UpdateSeo(args(&call.arguments)?)),
            "get_site_info" => Ok(SiteAction::GetSiteInfo),
            _ => Err(ParseActionError::Unknown),
        }
    }
}

/// Tool schemas advertised to the model, generated from the typed payloads.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    fn tool<T: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::to_value(schema_for!(T))
                .unwrap_or(serde_json::Value::Null),
        }
    }

    vec![
        tool::<AddSectionArgs>("add_section", "Add a new section to the page"),
        tool::<RemoveSectionArgs>("remove_section", "Remove a section by id or type"),
        tool::<EditSectionArgs>("edit_section", "Update fields of an existing section"),
        tool::<ReorderSectionsArgs>("reorder_sections", "Rearrange sections into a given order"),
        tool::<UpdateColorsArgs>("update_colors", "Change the site color palette"),
        tool::<UpdateFontsArgs>("update_fonts", "Change the heading and body fonts"),
        tool::<UpdateSeoArgs>("update_seo", "Update the page title and meta description"),
        ToolDefinition {
            name: "get_site_info".to_string(),
            description: "Read a summary of the current site without changing it".to_string(),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_action() {
        let call = ToolCall {
            id: "t1".to_string(),
            name: "add_section".to_string(),
            arguments: serde_json::json!({
                "section_type": "pricing",
                "position": "end"
            }),
        };
        match SiteAction::parse(&call) {
            Ok(SiteAction::AddSection(args)) => {
                assert_eq!(args.section_type, SectionType::Pricing);
                assert_eq!(args.position, InsertPosition::End);
            }
            other => panic!("unexpected parse result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_action() {
        let call = ToolCall {
            id: "t1".to_string(),
            name: "launch_rocket".to_string(),
            arguments: serde_json::Value::Null,
        };
        assert!(matches!(
            SiteAction::parse(&call),
            Err(ParseActionError::Unknown)
        ));
    }

    #[test]
    fn test_parse_invalid_arguments() {
        let call = ToolCall {
            id: "t1".to_string(),
            name: "add_section".to_string(),
            arguments: serde_json::json!({ "section_type": "not_a_kind" }),
        };
        assert!(matches!(
            SiteAction::parse(&call),
            Err(ParseActionError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_tool_definitions_cover_all_actions() {
        let names: Vec<String> = tool_definitions().into_iter().map(|t| t.name).collect();
        for expected in [
            "add_section",
            "remove_section",
            "edit_section",
            "reorder_sections",
            "update_colors",
            "update_fonts",
            "update_seo",
            "get_site_info",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }
}
