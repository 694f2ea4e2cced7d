//! # Action Executor
//!
//! Applies validated tool calls to a `SiteState`. One executor instance
//! owns one site for the duration of a command; callers serialize access
//! per project. Every mutation is all-or-nothing: an action either fully
//! updates the state or reports failure and leaves it untouched.

use chrono::Utc;
use tracing::debug;

use crate::state::{SectionContent, SectionType, SiteState};

use super::{
    ActionResult, AddSectionArgs, EditSectionArgs, InsertPosition, ParseActionError,
    RemoveSectionArgs, ReorderSectionsArgs, SiteAction, ToolCall, UpdateColorsArgs,
    UpdateFontsArgs, UpdateSeoArgs,
};

pub struct ActionExecutor {
    state: SiteState,
    /// Results accumulated across `execute` calls, in application order
    pending_changes: Vec<ActionResult>,
    /// Disambiguates ids minted within the same millisecond
    seq: u64,
}

impl ActionExecutor {
    pub fn new(state: SiteState) -> Self {
        Self {
            state,
            pending_changes: Vec::new(),
            seq: 0,
        }
    }

    pub fn state(&self) -> &SiteState {
        &self.state
    }

    pub fn into_state(self) -> SiteState {
        self.state
    }

    pub fn pending_changes(&self) -> &[ActionResult] {
        &self.pending_changes
    }

    /// Apply one tool call. Never panics and never returns `Err`; failures
    /// come back as `ActionResult { success: false, .. }`.
    pub fn execute(&mut self, call: &ToolCall) -> ActionResult {
        let result = match SiteAction::parse(call) {
            Ok(action) => self.apply(action),
            Err(ParseActionError::Unknown) => {
                ActionResult::failed(&call.name, "Action not implemented")
            }
            Err(ParseActionError::InvalidArguments(message)) => ActionResult::failed(
                &call.name,
                format!("Invalid arguments: {}", message),
            ),
        };
        debug!(
            action = %call.name,
            success = result.success,
            "applied tool call"
        );
        self.pending_changes.push(result.clone());
        result
    }

    /// Apply a batch strictly in order. Later calls observe the mutations
    /// of earlier calls, so a section added by call N can be edited by
    /// call N+1.
    pub fn execute_all(&mut self, calls: &[ToolCall]) -> Vec<ActionResult> {
        calls.iter().map(|call| self.execute(call)).collect()
    }

    fn apply(&mut self, action: SiteAction) -> ActionResult {
        match action {
            SiteAction::AddSection(args) => self.add_section(args),
            SiteAction::RemoveSection(args) => self.remove_section(args),
            SiteAction::EditSection(args) => self.edit_section(args),
            SiteAction::ReorderSections(args) => self.reorder_sections(args),
            SiteAction::UpdateColors(args) => self.update_colors(args),
            SiteAction::UpdateFonts(args) => self.update_fonts(args),
            SiteAction::UpdateSeo(args) => self.update_seo(args),
            SiteAction::GetSiteInfo => self.get_site_info(),
        }
    }

    fn next_section_id(&mut self) -> String {
        self.seq += 1;
        format!("section-{}-{}", Utc::now().timestamp_millis(), self.seq)
    }

    fn add_section(&mut self, args: AddSectionArgs) -> ActionResult {
        let id = self.next_section_id();
        let section = SectionContent {
            id: id.clone(),
            section_type: args.section_type,
            title: args
                .title
                .unwrap_or_else(|| default_title(args.section_type)),
            subtitle: args.subtitle,
            content: args.content,
            items: args.items,
        };

        let index = match args.position {
            InsertPosition::Start => 0,
            InsertPosition::End => self.state.sections.len(),
            // Mirrors an indexOf lookup: no hero yields -1, so the new
            // section lands at index 0
            InsertPosition::AfterHero => self
                .state
                .index_of_type(SectionType::Hero)
                .map(|i| i + 1)
                .unwrap_or(0),
            InsertPosition::BeforeContact => self
                .state
                .index_of_type(SectionType::Contact)
                .unwrap_or(self.state.sections.len()),
        };

        self.state.sections.insert(index, section);
        ActionResult::ok_with_changes(
            "add_section",
            format!("Added {} section", args.section_type.as_str()),
            serde_json::json!({ "section_id": id, "index": index }),
        )
    }

    fn find_section(&self, id: Option<&str>, section_type: Option<SectionType>) -> Option<usize> {
        if let Some(id) = id {
            if let Some(index) = self.state.sections.iter().position(|s| s.id == id) {
                return Some(index);
            }
        }
        section_type.and_then(|t| self.state.index_of_type(t))
    }

    fn remove_section(&mut self, args: RemoveSectionArgs) -> ActionResult {
        match self.find_section(args.section_id.as_deref(), args.section_type) {
            Some(index) => {
                let removed = self.state.sections.remove(index);
                ActionResult::ok_with_changes(
                    "remove_section",
                    format!("Removed {} section", removed.section_type.as_str()),
                    serde_json::json!({ "section_id": removed.id }),
                )
            }
            None => ActionResult::failed("remove_section", "Could not find section to remove"),
        }
    }

    fn edit_section(&mut self, args: EditSectionArgs) -> ActionResult {
        match self.find_section(args.section_id.as_deref(), args.section_type) {
            Some(index) => {
                let section = &mut self.state.sections[index];
                let mut applied = Vec::new();
                if let Some(title) = args.updates.title {
                    section.title = title;
                    applied.push("title");
                }
                if let Some(subtitle) = args.updates.subtitle {
                    section.subtitle = Some(subtitle);
                    applied.push("subtitle");
                }
                if let Some(content) = args.updates.content {
                    section.content = Some(content);
                    applied.push("content");
                }
                if let Some(items) = args.updates.items {
                    section.items = Some(items);
                    applied.push("items");
                }
                ActionResult::ok_with_changes(
                    "edit_section",
                    format!("Updated {} section", section.section_type.as_str()),
                    serde_json::json!({ "section_id": section.id, "fields": applied }),
                )
            }
            None => ActionResult::failed("edit_section", "Could not find section to edit"),
        }
    }

    /// Stable partial permutation: listed ids come first in the given
    /// order, everything else follows in its original relative order.
    fn reorder_sections(&mut self, args: ReorderSectionsArgs) -> ActionResult {
        let mut remaining = std::mem::take(&mut self.state.sections);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in &args.order {
            if let Some(index) = remaining.iter().position(|s| &s.id == id) {
                reordered.push(remaining.remove(index));
            }
        }
        reordered.append(&mut remaining);
        self.state.sections = reordered;

        let order: Vec<&str> = self.state.sections.iter().map(|s| s.id.as_str()).collect();
        ActionResult::ok_with_changes(
            "reorder_sections",
            "Reordered sections",
            serde_json::json!({ "order": order }),
        )
    }

    fn update_colors(&mut self, args: UpdateColorsArgs) -> ActionResult {
        let mut applied = Vec::new();
        if let Some(primary) = args.primary_color {
            self.state.styles.primary_color = primary;
            applied.push("primaryColor");
        }
        if let Some(secondary) = args.secondary_color {
            self.state.styles.secondary_color = secondary;
            applied.push("secondaryColor");
        }
        if let Some(accent) = args.accent_color {
            self.state.styles.accent_color = Some(accent);
            applied.push("accentColor");
        }
        ActionResult::ok_with_changes(
            "update_colors",
            "Updated colors",
            serde_json::json!({ "fields": applied }),
        )
    }

    fn update_fonts(&mut self, args: UpdateFontsArgs) -> ActionResult {
        let mut applied = Vec::new();
        if let Some(heading) = args.heading_font {
            self.state.styles.heading_font = Some(heading);
            applied.push("headingFont");
        }
        if let Some(body) = args.body_font {
            self.state.styles.body_font = Some(body);
            applied.push("bodyFont");
        }
        ActionResult::ok_with_changes(
            "update_fonts",
            "Updated fonts",
            serde_json::json!({ "fields": applied }),
        )
    }

    fn update_seo(&mut self, args: UpdateSeoArgs) -> ActionResult {
        let mut applied = Vec::new();
        if let Some(title) = args.title {
            self.state.meta.title = title;
            applied.push("title");
        }
        if let Some(description) = args.description {
            self.state.meta.description = description;
            applied.push("description");
        }
        ActionResult::ok_with_changes(
            "update_seo",
            "Updated SEO metadata",
            serde_json::json!({ "fields": applied }),
        )
    }

    fn get_site_info(&mut self) -> ActionResult {
        let types: Vec<&str> = self
            .state
            .sections
            .iter()
            .map(|s| s.section_type.as_str())
            .collect();
        ActionResult::ok_with_changes(
            "get_site_info",
            "Read site summary",
            serde_json::json!({
                "summary": self.state.summary(),
                "section_count": self.state.sections.len(),
                "section_types": types,
                "styles": self.state.styles,
                "meta": self.state.meta,
            }),
        )
    }
}

fn default_title(section_type: SectionType) -> String {
    let name = section_type.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: format!("call-{}", name),
            name: name.to_string(),
            arguments,
        }
    }

    fn state_with(types: &[SectionType]) -> SiteState {
        let mut state = SiteState::new("p1", "s1");
        for (i, t) in types.iter().enumerate() {
            state.sections.push(SectionContent {
                id: format!("sec-{}", i),
                section_type: *t,
                title: t.as_str().to_string(),
                subtitle: None,
                content: None,
                items: None,
            });
        }
        state
    }

    #[test]
    fn test_add_section_after_hero() {
        let state = state_with(&[
            SectionType::Hero,
            SectionType::Features,
            SectionType::Contact,
        ]);
        let mut executor = ActionExecutor::new(state);

        let result = executor.execute(&call(
            "add_section",
            serde_json::json!({ "section_type": "testimonials", "position": "after_hero" }),
        ));
        assert!(result.success, "{:?}", result.error);

        let types: Vec<SectionType> = executor
            .state()
            .sections
            .iter()
            .map(|s| s.section_type)
            .collect();
        assert_eq!(
            types,
            vec![
                SectionType::Hero,
                SectionType::Testimonials,
                SectionType::Features,
                SectionType::Contact
            ]
        );
    }

    #[test]
    fn test_add_after_hero_without_hero_inserts_at_start() {
        let state = state_with(&[SectionType::Features, SectionType::Contact]);
        let mut executor = ActionExecutor::new(state);

        executor.execute(&call(
            "add_section",
            serde_json::json!({ "section_type": "pricing", "position": "after_hero" }),
        ));
        assert_eq!(
            executor.state().sections[0].section_type,
            SectionType::Pricing
        );
    }

    #[test]
    fn test_add_section_before_contact() {
        let state = state_with(&[SectionType::Hero, SectionType::Contact]);
        let mut executor = ActionExecutor::new(state);

        let result = executor.execute(&call(
            "add_section",
            serde_json::json!({ "section_type": "faq", "position": "before_contact" }),
        ));
        assert!(result.success, "{:?}", result.error);

        let types: Vec<SectionType> = executor
            .state()
            .sections
            .iter()
            .map(|s| s.section_type)
            .collect();
        assert_eq!(
            types,
            vec![SectionType::Hero, SectionType::Faq, SectionType::Contact]
        );
    }

    #[test]
    fn test_add_before_contact_without_contact_appends() {
        let state = state_with(&[SectionType::Hero]);
        let mut executor = ActionExecutor::new(state);

        executor.execute(&call(
            "add_section",
            serde_json::json!({ "section_type": "faq", "position": "before_contact" }),
        ));
        let types: Vec<SectionType> = executor
            .state()
            .sections
            .iter()
            .map(|s| s.section_type)
            .collect();
        assert_eq!(types, vec![SectionType::Hero, SectionType::Faq]);
    }

    #[test]
    fn test_add_section_grows_by_one_with_fresh_id() {
        let state = state_with(&[SectionType::Hero]);
        let existing: Vec<String> = state.sections.iter().map(|s| s.id.clone()).collect();
        let mut executor = ActionExecutor::new(state);

        let result = executor.execute(&call(
            "add_section",
            serde_json::json!({ "section_type": "faq" }),
        ));
        assert!(result.success);
        assert_eq!(executor.state().sections.len(), 2);

        let new_id = result.changes.unwrap()["section_id"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(!existing.contains(&new_id));
    }

    #[test]
    fn test_remove_missing_section_reports_error() {
        let state = state_with(&[SectionType::Hero]);
        let mut executor = ActionExecutor::new(state);

        let result = executor.execute(&call(
            "remove_section",
            serde_json::json!({ "section_type": "pricing" }),
        ));
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Could not find section to remove")
        );
        assert_eq!(executor.state().sections.len(), 1);
    }

    #[test]
    fn test_edit_prefers_id_over_type() {
        let state = state_with(&[SectionType::Features, SectionType::Features]);
        let mut executor = ActionExecutor::new(state);

        let result = executor.execute(&call(
            "edit_section",
            serde_json::json!({
                "section_id": "sec-1",
                "section_type": "features",
                "updates": { "title": "Why us" }
            }),
        ));
        assert!(result.success);
        assert_eq!(executor.state().sections[0].title, "features");
        assert_eq!(executor.state().sections[1].title, "Why us");
    }

    #[test]
    fn test_edit_merges_shallowly() {
        let mut state = state_with(&[SectionType::About]);
        state.sections[0].subtitle = Some("Since 2010".to_string());
        let mut executor = ActionExecutor::new(state);

        executor.execute(&call(
            "edit_section",
            serde_json::json!({
                "section_type": "about",
                "updates": { "content": "We build things." }
            }),
        ));
        let section = &executor.state().sections[0];
        assert_eq!(section.subtitle.as_deref(), Some("Since 2010"));
        assert_eq!(section.content.as_deref(), Some("We build things."));
    }

    #[test]
    fn test_reorder_is_stable_partial_permutation() {
        let state = state_with(&[
            SectionType::Hero,     // sec-0
            SectionType::Features, // sec-1
            SectionType::Pricing,  // sec-2
            SectionType::Contact,  // sec-3
        ]);
        let mut executor = ActionExecutor::new(state);

        executor.execute(&call(
            "reorder_sections",
            serde_json::json!({ "order": ["sec-2", "sec-0"] }),
        ));
        let ids: Vec<&str> = executor
            .state()
            .sections
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["sec-2", "sec-0", "sec-1", "sec-3"]);
    }

    #[test]
    fn test_update_colors_leaves_absent_fields() {
        let mut state = state_with(&[]);
        state.styles.primary_color = "#112233".to_string();
        state.styles.secondary_color = "#445566".to_string();
        let mut executor = ActionExecutor::new(state);

        executor.execute(&call(
            "update_colors",
            serde_json::json!({ "primaryColor": "#ff0000" }),
        ));
        assert_eq!(executor.state().styles.primary_color, "#ff0000");
        assert_eq!(executor.state().styles.secondary_color, "#445566");
    }

    #[test]
    fn test_unknown_action_does_not_throw() {
        let mut executor = ActionExecutor::new(state_with(&[]));
        let result = executor.execute(&call("make_coffee", serde_json::json!({})));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Action not implemented"));
    }

    #[test]
    fn test_batch_later_calls_see_earlier_mutations() {
        let mut executor = ActionExecutor::new(state_with(&[]));

        let results = executor.execute_all(&[
            call(
                "add_section",
                serde_json::json!({ "section_type": "pricing" }),
            ),
            call(
                "edit_section",
                serde_json::json!({
                    "section_type": "pricing",
                    "updates": { "title": "Plans" }
                }),
            ),
        ]);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(executor.state().sections[0].title, "Plans");
        assert_eq!(executor.pending_changes().len(), 2);
    }

    #[test]
    fn test_get_site_info_is_read_only() {
        let state = state_with(&[SectionType::Hero, SectionType::Contact]);
        let before = serde_json::to_string(&state).unwrap();
        let mut executor = ActionExecutor::new(state);

        let result = executor.execute(&call("get_site_info", serde_json::json!({})));
        assert!(result.success);
        let changes = result.changes.unwrap();
        assert_eq!(changes["section_count"], 2);
        assert!(changes["summary"]
            .as_str()
            .unwrap()
            .contains("hero, contact"));
        assert_eq!(serde_json::to_string(executor.state()).unwrap(), before);
    }
}
