//! # Prompt Builder
//!
//! Assembles the system prompt from the active capability set, current
//! site state, business info, and memory context. Pure and deterministic:
//! identical inputs always produce the identical string.

use std::collections::BTreeMap;

use crate::capabilities::{Capability, CapabilityCategory, CapabilityStatus};
use crate::state::SiteState;

/// Display order of capability groups in the prompt.
const GROUP_ORDER: [CapabilityCategory; 8] = [
    CapabilityCategory::Structure,
    CapabilityCategory::Content,
    CapabilityCategory::Design,
    CapabilityCategory::Seo,
    CapabilityCategory::AiGenerate,
    CapabilityCategory::Media,
    CapabilityCategory::Integrations,
    CapabilityCategory::Publishing,
];

const IDENTITY: &str = "You are the Sitewright assistant. You edit a user's website through \
tool calls in response to natural-language instructions. You are precise: you only change \
what the user asked for, and you explain what you changed in plain language.";

const OPERATING_INSTRUCTIONS: &str = "## How to respond\n\
- Use the provided tools for every site change; never describe a change without making it.\n\
- Batch related changes into one turn; order matters, later calls see earlier results.\n\
- If the request is ambiguous, ask one clarifying question instead of guessing.\n\
- After making changes, summarize them in one or two sentences.";

/// Everything the prompt is built from. All parts optional except the
/// capability set; absent parts simply omit their section.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub capabilities: &'a [&'a Capability],
    pub coming_soon: &'a [&'a Capability],
    pub site: Option<&'a SiteState>,
    pub business: Option<&'a BTreeMap<String, String>>,
    pub memory_context: Option<&'a str>,
    pub extra_context: Option<&'a str>,
}

/// Render one capability line according to its status. Each status has a
/// dedicated formatter; there is no inline branching inside the text.
fn render_capability(capability: &Capability) -> String {
    match capability.status {
        CapabilityStatus::Active => render_active(capability),
        CapabilityStatus::Beta => render_beta(capability),
        CapabilityStatus::ComingSoon => render_coming_soon(capability),
        CapabilityStatus::Deprecated => String::new(),
    }
}

fn render_active(capability: &Capability) -> String {
    format!("- {}: {}", capability.name, capability.description)
}

fn render_beta(capability: &Capability) -> String {
    format!("- {} (beta): {}", capability.name, capability.description)
}

fn render_coming_soon(capability: &Capability) -> String {
    format!("- {}: {}", capability.name, capability.description)
}

fn capabilities_section(inputs: &PromptInputs) -> String {
    let mut out = String::from("## What you can do\n");
    for category in GROUP_ORDER {
        let group: Vec<&&Capability> = inputs
            .capabilities
            .iter()
            .filter(|c| c.category == category)
            .collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!("\n### {}\n", category.display_name()));
        for capability in group {
            let line = render_capability(capability);
            if !line.is_empty() {
                out.push_str(&line);
                out.push('\n');
            }
        }
    }

    if !inputs.coming_soon.is_empty() {
        out.push_str(
            "\n### Coming soon\n\
             These are not available yet. Acknowledge the request, say the feature is on \
             its way, and offer an alternative from the list above.\n",
        );
        for capability in inputs.coming_soon {
            out.push_str(&render_capability(capability));
            out.push('\n');
        }
    }
    out
}

fn site_section(site: &SiteState) -> String {
    let mut out = String::from("## Current site\n");
    if site.sections.is_empty() {
        out.push_str("The page has no sections yet.\n");
    } else {
        out.push_str("Sections, top to bottom:\n");
        for section in &site.sections {
            out.push_str(&format!(
                "- [{}] {} \"{}\"\n",
                section.id,
                section.section_type.as_str(),
                section.title
            ));
        }
    }
    out.push_str(&format!(
        "Colors: primary {}, secondary {}",
        site.styles.primary_color, site.styles.secondary_color
    ));
    if let Some(accent) = &site.styles.accent_color {
        out.push_str(&format!(", accent {}", accent));
    }
    out.push('\n');
    if let (Some(heading), Some(body)) = (&site.styles.heading_font, &site.styles.body_font) {
        out.push_str(&format!("Fonts: {} / {}\n", heading, body));
    }
    if !site.meta.title.is_empty() {
        out.push_str(&format!(
            "Meta: \"{}\" - {}\n",
            site.meta.title, site.meta.description
        ));
    }
    out
}

fn business_section(business: &BTreeMap<String, String>) -> String {
    let mut out = String::from("## About the business\n");
    for (key, value) in business {
        out.push_str(&format!("- {}: {}\n", key, value));
    }
    out
}

/// Per-capability tool guide: tool name, triggers, up to two sample
/// phrasings.
fn tool_guide_section(capabilities: &[&Capability]) -> String {
    let with_tools: Vec<&&Capability> =
        capabilities.iter().filter(|c| c.tool.is_some()).collect();
    if with_tools.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Tool guide\n");
    for capability in with_tools {
        let tool = capability.tool.as_deref().unwrap_or_default();
        out.push_str(&format!(
            "- `{}` - triggers: {}",
            tool,
            capability.triggers.join(", ")
        ));
        let samples: Vec<String> = capability
            .triggers
            .iter()
            .take(2)
            .map(|t| format!("\"{} ...\"", t))
            .collect();
        if !samples.is_empty() {
            out.push_str(&format!("; e.g. {}", samples.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Build the full system prompt. Sections are generated independently and
/// concatenated; a section with no input is omitted entirely.
pub fn build_system_prompt(inputs: &PromptInputs) -> String {
    let mut sections: Vec<String> = vec![IDENTITY.to_string()];

    sections.push(capabilities_section(inputs));

    if let Some(site) = inputs.site {
        sections.push(site_section(site));
    }
    if let Some(business) = inputs.business {
        if !business.is_empty() {
            sections.push(business_section(business));
        }
    }
    if let Some(memory) = inputs.memory_context {
        if !memory.is_empty() {
            sections.push(format!("## What you remember\n{}", memory));
        }
    }
    sections.push(OPERATING_INSTRUCTIONS.to_string());
    sections.push(tool_guide_section(inputs.capabilities));
    if let Some(extra) = inputs.extra_context {
        if !extra.is_empty() {
            sections.push(format!("## Additional context\n{}", extra));
        }
    }

    sections.retain(|s| !s.is_empty());
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityRegistry, UserContext};
    use crate::state::{SectionContent, SectionType};

    fn registry_parts(
        registry: &CapabilityRegistry,
    ) -> (Vec<&Capability>, Vec<&Capability>) {
        (
            registry.available(&UserContext::default()),
            registry.coming_soon(),
        )
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let registry = CapabilityRegistry::builtin();
        let (available, coming_soon) = registry_parts(&registry);
        let inputs = PromptInputs {
            capabilities: &available,
            coming_soon: &coming_soon,
            ..Default::default()
        };
        assert_eq!(build_system_prompt(&inputs), build_system_prompt(&inputs));
    }

    #[test]
    fn test_sections_omitted_without_input() {
        let registry = CapabilityRegistry::builtin();
        let (available, coming_soon) = registry_parts(&registry);
        let inputs = PromptInputs {
            capabilities: &available,
            coming_soon: &coming_soon,
            ..Default::default()
        };
        let prompt = build_system_prompt(&inputs);
        assert!(!prompt.contains("## Current site"));
        assert!(!prompt.contains("## About the business"));
        assert!(!prompt.contains("## What you remember"));
        assert!(prompt.contains("## How to respond"));
    }

    #[test]
    fn test_coming_soon_listed_separately() {
        let registry = CapabilityRegistry::builtin();
        let (available, coming_soon) = registry_parts(&registry);
        let inputs = PromptInputs {
            capabilities: &available,
            coming_soon: &coming_soon,
            ..Default::default()
        };
        let prompt = build_system_prompt(&inputs);
        assert!(prompt.contains("### Coming soon"));
        assert!(prompt.contains("Upload Media"));
        let coming_idx = prompt.find("### Coming soon").unwrap();
        let media_idx = prompt.find("Upload Media").unwrap();
        assert!(media_idx > coming_idx);
    }

    #[test]
    fn test_site_summary_included() {
        let registry = CapabilityRegistry::builtin();
        let (available, coming_soon) = registry_parts(&registry);

        let mut site = SiteState::new("p1", "s1");
        site.styles.primary_color = "#123456".to_string();
        site.styles.secondary_color = "#654321".to_string();
        site.sections.push(SectionContent {
            id: "sec-1".to_string(),
            section_type: SectionType::Hero,
            title: "Welcome".to_string(),
            subtitle: None,
            content: None,
            items: None,
        });

        let inputs = PromptInputs {
            capabilities: &available,
            coming_soon: &coming_soon,
            site: Some(&site),
            ..Default::default()
        };
        let prompt = build_system_prompt(&inputs);
        assert!(prompt.contains("[sec-1] hero \"Welcome\""));
        assert!(prompt.contains("primary #123456"));
    }

    #[test]
    fn test_tool_guide_lists_tool_names() {
        let registry = CapabilityRegistry::builtin();
        let (available, coming_soon) = registry_parts(&registry);
        let inputs = PromptInputs {
            capabilities: &available,
            coming_soon: &coming_soon,
            ..Default::default()
        };
        let prompt = build_system_prompt(&inputs);
        assert!(prompt.contains("`add_section`"));
        assert!(prompt.contains("`update_colors`"));
    }
}
