//! # Capability Registry
//!
//! Static catalog of user-invokable actions. Loaded once at startup and
//! immutable afterwards; filtering against a `UserContext` produces the set
//! the prompt builder advertises and the matcher scores against.

use serde::{Deserialize, Serialize};

/// Plan tiers, ordered. Requirement checks are ordinal: a `Pro` capability
/// is available to `Pro` and `Enterprise` users.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

/// Functional grouping for prompt sections and UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    Content,
    Design,
    Media,
    Structure,
    Seo,
    Integrations,
    Publishing,
    AiGenerate,
}

impl CapabilityCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Content => "Content",
            Self::Design => "Design",
            Self::Media => "Media",
            Self::Structure => "Structure",
            Self::Seo => "SEO",
            Self::Integrations => "Integrations",
            Self::Publishing => "Publishing",
            Self::AiGenerate => "AI Generation",
        }
    }
}

/// Lifecycle status of a capability. Rendering differs per status: active
/// and beta capabilities are offered as tools, coming-soon ones are
/// acknowledged but deferred, deprecated ones are hidden.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    Active,
    Beta,
    ComingSoon,
    Deprecated,
}

/// Gating requirements; every present requirement must be satisfied.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CapabilityRequirements {
    #[serde(default)]
    pub min_plan: Option<PlanTier>,
    #[serde(default)]
    pub integrations: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub feature_flags: Vec<String>,
}

/// One catalog entry. Immutable after registry load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: CapabilityCategory,
    pub status: CapabilityStatus,
    /// Lowercase phrases matched as substrings of user input
    pub triggers: Vec<String>,
    #[serde(default)]
    pub requirements: Option<CapabilityRequirements>,
    /// Name of the tool the model invokes for this capability, if any
    #[serde(default)]
    pub tool: Option<String>,
    /// Higher = more specific; feeds the matcher score
    #[serde(default)]
    pub priority: i32,
}

/// What the current user/project can do; checked against requirements.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub plan: PlanTier,
    pub integrations: Vec<String>,
    pub assets: Vec<String>,
    pub feature_flags: Vec<String>,
}

/// The loaded catalog.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    capabilities: Vec<Capability>,
}

impl CapabilityRegistry {
    pub fn new(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    pub fn all(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn get(&self, id: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.id == id)
    }

    /// Active/beta capabilities whose requirements the context satisfies.
    /// Coming-soon entries are excluded here; the prompt builder lists them
    /// separately via `coming_soon`.
    pub fn available(&self, ctx: &UserContext) -> Vec<&Capability> {
        self.capabilities
            .iter()
            .filter(|c| matches!(c.status, CapabilityStatus::Active | CapabilityStatus::Beta))
            .filter(|c| Self::requirements_met(c, ctx))
            .collect()
    }

    pub fn coming_soon(&self) -> Vec<&Capability> {
        self.capabilities
            .iter()
            .filter(|c| c.status == CapabilityStatus::ComingSoon)
            .collect()
    }

    fn requirements_met(capability: &Capability, ctx: &UserContext) -> bool {
        let Some(req) = &capability.requirements else {
            return true;
        };
        if let Some(min_plan) = req.min_plan {
            if ctx.plan < min_plan {
                return false;
            }
        }
        let has_all =
            |needed: &[String], held: &[String]| needed.iter().all(|n| held.contains(n));
        has_all(&req.integrations, &ctx.integrations)
            && has_all(&req.assets, &ctx.assets)
            && has_all(&req.feature_flags, &ctx.feature_flags)
    }

    /// The built-in catalog shipped with the editor.
    pub fn builtin() -> Self {
        let cap = |id: &str,
                   name: &str,
                   description: &str,
                   category: CapabilityCategory,
                   status: CapabilityStatus,
                   triggers: &[&str],
                   tool: Option<&str>,
                   priority: i32| Capability {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category,
            status,
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            requirements: None,
            tool: tool.map(|t| t.to_string()),
            priority,
        };

        let mut capabilities = vec![
            cap(
                "add_section",
                "Add Section",
                "Add a new section to the page (hero, features, pricing, testimonials, contact, ...)",
                CapabilityCategory::Structure,
                CapabilityStatus::Active,
                &["add", "create", "insert", "new section", "pricing", "testimonials", "faq", "gallery"],
                Some("add_section"),
                5,
            ),
            cap(
                "edit_section",
                "Edit Section",
                "Change the text, title, or items of an existing section",
                CapabilityCategory::Content,
                CapabilityStatus::Active,
                &["edit", "change", "update", "rewrite", "rename"],
                Some("edit_section"),
                4,
            ),
            cap(
                "remove_section",
                "Remove Section",
                "Delete a section from the page",
                CapabilityCategory::Structure,
                CapabilityStatus::Active,
                &["remove", "delete", "get rid of"],
                Some("remove_section"),
                5,
            ),
            cap(
                "reorder_sections",
                "Reorder Sections",
                "Move sections around on the page",
                CapabilityCategory::Structure,
                CapabilityStatus::Active,
                &["reorder", "move", "rearrange", "swap"],
                Some("reorder_sections"),
                4,
            ),
            cap(
                "update_colors",
                "Change Colors",
                "Update the site color palette",
                CapabilityCategory::Design,
                CapabilityStatus::Active,
                &["color", "colour", "palette", "theme", "darker", "lighter"],
                Some("update_colors"),
                4,
            ),
            cap(
                "update_fonts",
                "Change Fonts",
                "Update the heading and body fonts",
                CapabilityCategory::Design,
                CapabilityStatus::Active,
                &["font", "typeface", "typography"],
                Some("update_fonts"),
                4,
            ),
            cap(
                "update_seo",
                "Update SEO",
                "Change the page title and meta description",
                CapabilityCategory::Seo,
                CapabilityStatus::Active,
                &["seo", "meta", "page title", "search"],
                Some("update_seo"),
                4,
            ),
            cap(
                "generate_copy",
                "Generate Copy",
                "Write or rewrite marketing copy for a section",
                CapabilityCategory::AiGenerate,
                CapabilityStatus::Active,
                &["write", "generate", "copy", "text for"],
                None,
                3,
            ),
            cap(
                "upload_media",
                "Upload Media",
                "Add images and video to the site",
                CapabilityCategory::Media,
                CapabilityStatus::ComingSoon,
                &["image", "photo", "video", "upload"],
                None,
                3,
            ),
            cap(
                "connect_forms",
                "Connect Forms",
                "Wire the contact form to an email or CRM integration",
                CapabilityCategory::Integrations,
                CapabilityStatus::ComingSoon,
                &["form", "crm", "mailchimp", "webhook"],
                None,
                3,
            ),
        ];

        let mut publish = cap(
            "publish_site",
            "Publish Site",
            "Publish the current draft to the live domain",
            CapabilityCategory::Publishing,
            CapabilityStatus::Active,
            &["publish", "go live", "deploy", "launch"],
            None,
            6,
        );
        publish.requirements = Some(CapabilityRequirements {
            min_plan: Some(PlanTier::Pro),
            ..Default::default()
        });
        capabilities.push(publish);

        let mut custom_domain = cap(
            "custom_domain",
            "Custom Domain",
            "Attach a custom domain to the published site",
            CapabilityCategory::Publishing,
            CapabilityStatus::Beta,
            &["domain", "dns", "www"],
            None,
            5,
        );
        custom_domain.requirements = Some(CapabilityRequirements {
            min_plan: Some(PlanTier::Pro),
            integrations: vec!["dns".to_string()],
            ..Default::default()
        });
        capabilities.push(custom_domain);

        Self::new(capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_tier_is_ordinal() {
        assert!(PlanTier::Free < PlanTier::Pro);
        assert!(PlanTier::Pro < PlanTier::Enterprise);
    }

    #[test]
    fn test_available_filters_plan_tier() {
        let registry = CapabilityRegistry::builtin();
        let free = UserContext::default();
        let available = registry.available(&free);
        assert!(available.iter().any(|c| c.id == "add_section"));
        assert!(!available.iter().any(|c| c.id == "publish_site"));

        let pro = UserContext {
            plan: PlanTier::Pro,
            ..Default::default()
        };
        let available = registry.available(&pro);
        assert!(available.iter().any(|c| c.id == "publish_site"));
    }

    #[test]
    fn test_available_requires_all_integrations() {
        let registry = CapabilityRegistry::builtin();
        let pro_no_dns = UserContext {
            plan: PlanTier::Pro,
            ..Default::default()
        };
        assert!(!registry
            .available(&pro_no_dns)
            .iter()
            .any(|c| c.id == "custom_domain"));

        let pro_with_dns = UserContext {
            plan: PlanTier::Pro,
            integrations: vec!["dns".to_string()],
            ..Default::default()
        };
        assert!(registry
            .available(&pro_with_dns)
            .iter()
            .any(|c| c.id == "custom_domain"));
    }

    #[test]
    fn test_coming_soon_excluded_from_available() {
        let registry = CapabilityRegistry::builtin();
        let ctx = UserContext {
            plan: PlanTier::Enterprise,
            integrations: vec!["dns".to_string()],
            ..Default::default()
        };
        let available = registry.available(&ctx);
        assert!(!available.iter().any(|c| c.id == "upload_media"));
        assert!(registry
            .coming_soon()
            .iter()
            .any(|c| c.id == "upload_media"));
    }
}
