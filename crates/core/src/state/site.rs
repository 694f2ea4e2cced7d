//! # Site State
//!
//! The in-memory model of one site: an ordered list of sections plus style
//! and meta values. Owned exclusively by one `ActionExecutor` during a
//! command; persisted through `SitewrightDb` after each batch of tool calls.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Closed set of section kinds the renderer understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Hero,
    Features,
    About,
    Services,
    Testimonials,
    Pricing,
    Gallery,
    Faq,
    Team,
    Cta,
    Contact,
    Footer,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Features => "features",
            Self::About => "about",
            Self::Services => "services",
            Self::Testimonials => "testimonials",
            Self::Pricing => "pricing",
            Self::Gallery => "gallery",
            Self::Faq => "faq",
            Self::Team => "team",
            Self::Cta => "cta",
            Self::Contact => "contact",
            Self::Footer => "footer",
        }
    }
}

/// A list entry inside a section (feature bullet, FAQ pair, plan card).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SectionItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// One renderable section of the site.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SectionContent {
    /// Unique within a SiteState at all times
    pub id: String,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<SectionItem>>,
}

/// Style values applied site-wide.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteStyles {
    pub primary_color: String,
    pub secondary_color: String,
    #[serde(default)]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub heading_font: Option<String>,
    #[serde(default)]
    pub body_font: Option<String>,
}

/// SEO / head metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
}

/// The complete mutable model of one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteState {
    pub project_id: String,
    pub site_id: String,
    #[serde(default)]
    pub sections: Vec<SectionContent>,
    #[serde(default)]
    pub styles: SiteStyles,
    #[serde(default)]
    pub meta: SiteMeta,
}

impl SiteState {
    pub fn new(project_id: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            site_id: site_id.into(),
            sections: Vec::new(),
            styles: SiteStyles::default(),
            meta: SiteMeta::default(),
        }
    }

    /// Index of the first section with the given type.
    pub fn index_of_type(&self, section_type: SectionType) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.section_type == section_type)
    }

    /// Short textual summary for `get_site_info`.
    pub fn summary(&self) -> String {
        let types: Vec<&str> = self
            .sections
            .iter()
            .map(|s| s.section_type.as_str())
            .collect();
        format!(
            "{} sections ({}); colors {}/{}; title \"{}\"",
            self.sections.len(),
            types.join(", "),
            self.styles.primary_color,
            self.styles.secondary_color,
            self.meta.title
        )
    }
}

/// What the renderer collaborator consumes: one block per section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInstance {
    pub id: String,
    pub block_type: String,
    pub variant: String,
    pub props: serde_json::Value,
}

impl SiteState {
    /// Map the section list into renderer blocks. Styles and meta travel
    /// separately through the design-token system.
    pub fn to_blocks(&self) -> Vec<BlockInstance> {
        self.sections
            .iter()
            .map(|section| BlockInstance {
                id: section.id.clone(),
                block_type: section.section_type.as_str().to_string(),
                variant: "default".to_string(),
                props: serde_json::json!({
                    "title": section.title,
                    "subtitle": section.subtitle,
                    "content": section.content,
                    "items": section.items,
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, section_type: SectionType) -> SectionContent {
        SectionContent {
            id: id.to_string(),
            section_type,
            title: format!("{} title", id),
            subtitle: None,
            content: None,
            items: None,
        }
    }

    #[test]
    fn test_index_of_type_finds_first_match() {
        let mut state = SiteState::new("p1", "s1");
        state.sections.push(section("a", SectionType::Hero));
        state.sections.push(section("b", SectionType::Features));
        state.sections.push(section("c", SectionType::Features));

        assert_eq!(state.index_of_type(SectionType::Features), Some(1));
        assert_eq!(state.index_of_type(SectionType::Contact), None);
    }

    #[test]
    fn test_summary_names_sections_in_order() {
        let mut state = SiteState::new("p1", "s1");
        state.styles.primary_color = "#112233".to_string();
        state.styles.secondary_color = "#445566".to_string();
        state.sections.push(section("a", SectionType::Hero));
        state.sections.push(section("b", SectionType::Contact));

        let summary = state.summary();
        assert!(summary.starts_with("2 sections (hero, contact)"));
        assert!(summary.contains("#112233/#445566"));
    }

    #[test]
    fn test_blocks_mirror_section_order() {
        let mut state = SiteState::new("p1", "s1");
        state.sections.push(section("a", SectionType::Hero));
        state.sections.push(section("b", SectionType::Contact));

        let blocks = state.to_blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, "a");
        assert_eq!(blocks[0].block_type, "hero");
        assert_eq!(blocks[1].block_type, "contact");
    }
}
