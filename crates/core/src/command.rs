//! # Command Service
//!
//! One chat turn, end to end: advisory matching, memory context, prompt
//! assembly, provider routing, tool-call execution, and persistence.
//! One service instance is shared; per-project serialization is the
//! caller's job (the server holds a mutex per project key).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actions::{tool_definitions, ActionExecutor, ActionResult, ToolCall};
use crate::capabilities::{match_capabilities, CapabilityRegistry, UserContext};
use crate::error::{CoreError, CoreResult};
use crate::memory::{modify_project, MemoryContextBuilder, MemoryRepository};
use crate::prompt::{build_system_prompt, PromptInputs};
use crate::providers::{AiMessage, AiRequest, ProviderRouter};
use crate::state::{BlockInstance, SiteState, SitewrightDb};

const HISTORY_LIMIT: usize = 20;
const FALLBACK_MESSAGE: &str = "I'm having trouble reaching the AI service right now. \
Your site hasn't been changed - please try again in a moment.";

/// A command arriving from the editor UI.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub project_id: String,
    pub user_id: String,
    pub session_id: String,
    pub command: String,
    #[serde(default)]
    pub selected_block_id: Option<String>,
}

/// Advisory match surfaced to the UI for suggestions/telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedCapability {
    pub id: String,
    pub name: String,
    pub confidence: f64,
    pub matched_triggers: Vec<String>,
}

/// What the editor gets back for one turn.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockInstance>>,
    pub action_results: Vec<ActionResult>,
    pub suggestions: Vec<SuggestedCapability>,
}

pub struct CommandService {
    registry: CapabilityRegistry,
    router: Arc<ProviderRouter>,
    repo: Arc<dyn MemoryRepository>,
    db: Arc<SitewrightDb>,
}

impl CommandService {
    pub fn new(
        registry: CapabilityRegistry,
        router: Arc<ProviderRouter>,
        repo: Arc<dyn MemoryRepository>,
        db: Arc<SitewrightDb>,
    ) -> Self {
        Self {
            registry,
            router,
            repo,
            db,
        }
    }

    pub async fn handle(
        &self,
        request: &CommandRequest,
        user_ctx: &UserContext,
    ) -> CoreResult<CommandResponse> {
        let site = self
            .db
            .get_site(&request.project_id)?
            .unwrap_or_else(|| SiteState::new(&request.project_id, &request.project_id));

        // Advisory only: logged and returned as suggestions, never a gate
        let available = self.registry.available(user_ctx);
        let matches = match_capabilities(&request.command, &available);
        let suggestions: Vec<SuggestedCapability> = matches
            .iter()
            .take(3)
            .map(|m| SuggestedCapability {
                id: m.capability.id.clone(),
                name: m.capability.name.clone(),
                confidence: m.confidence,
                matched_triggers: m.matched_triggers.clone(),
            })
            .collect();
        if let Some(top) = suggestions.first() {
            debug!(capability = %top.id, confidence = top.confidence, "top capability match");
        }

        let context_builder = MemoryContextBuilder::new(self.repo.clone(), self.db.clone());
        let memory = context_builder
            .build_context(&request.user_id, &request.project_id, &request.session_id)
            .await?;
        let memory_text = MemoryContextBuilder::build_system_prompt_section(&memory);

        let extra = request
            .selected_block_id
            .as_ref()
            .map(|id| format!("The user currently has section {} selected.", id));
        let coming_soon = self.registry.coming_soon();
        let system = build_system_prompt(&PromptInputs {
            capabilities: &available,
            coming_soon: &coming_soon,
            site: Some(&site),
            business: Some(&memory.project.business_details),
            memory_context: Some(&memory_text),
            extra_context: extra.as_deref(),
        });

        let mut messages =
            context_builder.get_conversation_history(&request.session_id, HISTORY_LIMIT)?;
        messages.push(AiMessage::user(&request.command));

        let ai_request = AiRequest {
            system: Some(system),
            messages,
            tools: tool_definitions(),
            ..Default::default()
        };

        let response = match self.router.complete(&ai_request).await {
            Ok(response) => response,
            Err(CoreError::ProviderExhausted { attempts, last }) => {
                warn!(attempts, %last, "all providers exhausted");
                return Ok(CommandResponse {
                    response: FALLBACK_MESSAGE.to_string(),
                    blocks: None,
                    action_results: Vec::new(),
                    suggestions,
                });
            }
            Err(e) => return Err(e),
        };

        let calls: Vec<ToolCall> = response
            .tool_calls
            .iter()
            .map(|tc| ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments: tc.arguments.clone(),
            })
            .collect();

        let mut executor = ActionExecutor::new(site);
        let action_results = executor.execute_all(&calls);
        let succeeded = action_results.iter().filter(|r| r.success).count();
        let site = executor.into_state();

        if succeeded > 0 {
            self.db.upsert_site(&site)?;
            self.record_change_history(&request.project_id, &action_results)
                .await?;
        }
        info!(
            project = %request.project_id,
            requested = action_results.len(),
            succeeded,
            "command applied"
        );

        let reply = compose_reply(&response.content, &action_results);

        self.db
            .ensure_chat_session(&request.session_id, &request.project_id)?;
        self.db
            .append_chat_message(&request.session_id, "user", &request.command)?;
        self.db
            .append_chat_message(&request.session_id, "assistant", &reply)?;

        Ok(CommandResponse {
            response: reply,
            blocks: (succeeded > 0).then(|| site.to_blocks()),
            action_results,
            suggestions,
        })
    }

    async fn record_change_history(
        &self,
        project_id: &str,
        results: &[ActionResult],
    ) -> CoreResult<()> {
        let descriptions: Vec<String> = results
            .iter()
            .filter(|r| r.success && r.action != "get_site_info")
            .map(|r| r.description.clone())
            .collect();
        if descriptions.is_empty() {
            return Ok(());
        }
        modify_project(self.repo.as_ref(), project_id, |project| {
            for description in &descriptions {
                project.record_design_decision(description.clone());
            }
        })
        .await?;
        Ok(())
    }
}

/// Model text plus a per-action report, so the user sees exactly which
/// requested changes went through.
fn compose_reply(content: &str, results: &[ActionResult]) -> String {
    let failures: Vec<&ActionResult> = results.iter().filter(|r| !r.success).collect();
    if results.is_empty() || failures.is_empty() {
        return if content.is_empty() {
            "Done.".to_string()
        } else {
            content.to_string()
        };
    }

    if failures.len() == results.len() {
        let mut reply = String::from("I couldn't make those changes:");
        for failure in &failures {
            reply.push_str(&format!(
                "\n- {}: {}",
                failure.action,
                failure.error.as_deref().unwrap_or("unknown error")
            ));
        }
        return reply;
    }

    let mut reply = content.to_string();
    reply.push_str("\n\nSome changes didn't go through:");
    for failure in &failures {
        reply.push_str(&format!(
            "\n- {}: {}",
            failure.action,
            failure.error.as_deref().unwrap_or("unknown error")
        ));
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;
    use crate::providers::RouterConfig;
    use crate::state::{SectionContent, SectionType};

    fn result(action: &str, success: bool) -> ActionResult {
        if success {
            ActionResult::ok(action, format!("{} ok", action))
        } else {
            ActionResult::failed(action, "Could not find section to remove")
        }
    }

    #[test]
    fn test_reply_passes_content_through_on_success() {
        let reply = compose_reply("Added your pricing table.", &[result("add_section", true)]);
        assert_eq!(reply, "Added your pricing table.");
    }

    #[test]
    fn test_reply_reports_partial_failures() {
        let reply = compose_reply(
            "Done.",
            &[result("add_section", true), result("remove_section", false)],
        );
        assert!(reply.contains("Some changes didn't go through"));
        assert!(reply.contains("remove_section: Could not find section to remove"));
    }

    #[test]
    fn test_reply_when_everything_failed() {
        let reply = compose_reply("ignored", &[result("remove_section", false)]);
        assert!(reply.starts_with("I couldn't make those changes"));
        assert!(!reply.contains("ignored"));
    }

    #[tokio::test]
    async fn test_provider_outage_leaves_site_untouched() {
        // No configured providers, so routing is guaranteed to exhaust
        let router = Arc::new(ProviderRouter::new(Vec::new(), RouterConfig::default()));
        let db = Arc::new(SitewrightDb::open_in_memory().unwrap());
        let service = CommandService::new(
            CapabilityRegistry::builtin(),
            router,
            Arc::new(InMemoryRepository::new()),
            db.clone(),
        );

        let mut site = SiteState::new("p1", "s1");
        site.sections.push(SectionContent {
            id: "sec-0".to_string(),
            section_type: SectionType::Hero,
            title: "Welcome".to_string(),
            subtitle: None,
            content: None,
            items: None,
        });
        db.upsert_site(&site).unwrap();

        let request = CommandRequest {
            project_id: "p1".to_string(),
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            command: "add a pricing section".to_string(),
            selected_block_id: None,
        };
        let response = service
            .handle(&request, &UserContext::default())
            .await
            .unwrap();

        assert_eq!(response.response, FALLBACK_MESSAGE);
        assert!(response.action_results.is_empty());
        assert!(response.blocks.is_none());

        let stored = db.get_site("p1").unwrap().unwrap();
        assert_eq!(stored.sections.len(), 1);
        assert_eq!(stored.sections[0].title, "Welcome");
    }
}
