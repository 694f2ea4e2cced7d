//! # Memory Context Builder
//!
//! Aggregates the three memory tiers into prompt-ready text and replays
//! chat history in the neutral role shape the providers expect.

use std::sync::Arc;

use crate::error::CoreResult;
use crate::providers::{AiMessage, MessageRole};
use crate::state::SitewrightDb;

use super::stores::{MemoryRepository, ProjectMemory, SessionMemory, UserMemory};

/// Snapshot of all three tiers for one turn.
#[derive(Debug, Clone)]
pub struct MemoryContext {
    pub user: UserMemory,
    pub project: ProjectMemory,
    pub session: SessionMemory,
}

pub struct MemoryContextBuilder {
    repo: Arc<dyn MemoryRepository>,
    db: Arc<SitewrightDb>,
}

impl MemoryContextBuilder {
    pub fn new(repo: Arc<dyn MemoryRepository>, db: Arc<SitewrightDb>) -> Self {
        Self { repo, db }
    }

    /// Read all three tiers. The reads are independent, so they run
    /// concurrently.
    pub async fn build_context(
        &self,
        user_id: &str,
        project_id: &str,
        session_id: &str,
    ) -> CoreResult<MemoryContext> {
        let (user, project, session) = tokio::join!(
            self.repo.get_or_create_user(user_id),
            self.repo.get_or_create_project(project_id),
            self.repo.get_or_create_session(session_id),
        );
        Ok(MemoryContext {
            user: user?.record,
            project: project?.record,
            session: session?.record,
        })
    }

    /// Pure formatter: headed sections, each omitted when its source data
    /// is empty.
    pub fn build_system_prompt_section(context: &MemoryContext) -> String {
        let mut out = String::new();

        let user = &context.user;
        if !user.style_preferences.is_empty()
            || user.business_context.is_some()
            || !user.interaction_patterns.is_empty()
        {
            out.push_str("## User Preferences\n");
            if !user.style_preferences.is_empty() {
                for (key, value) in &user.style_preferences {
                    out.push_str(&format!("- {}: {}\n", key, value));
                }
            }
            if let Some(business_context) = &user.business_context {
                out.push_str(&format!("- Business context: {}\n", business_context));
            }
            for pattern in &user.interaction_patterns {
                out.push_str(&format!("- Tends to: {}\n", pattern));
            }
            out.push('\n');
        }

        let project = &context.project;
        if !project.business_details.is_empty()
            || !project.site_goals.is_empty()
            || !project.design_decisions.is_empty()
            || !project.discovered_info.is_empty()
        {
            out.push_str("## Project Context\n");
            for (key, value) in &project.business_details {
                out.push_str(&format!("- {}: {}\n", key, value));
            }
            if !project.site_goals.is_empty() {
                out.push_str(&format!("- Site goals: {}\n", project.site_goals.join(", ")));
            }
            for decision in project.design_decisions.iter().rev().take(5) {
                out.push_str(&format!("- Decided: {}\n", decision.decision));
            }
            for (key, value) in &project.discovered_info {
                out.push_str(&format!("- Learned: {} = {}\n", key, value));
            }
            out.push('\n');
        }

        let session = &context.session;
        if !session.current_tasks.is_empty() || !session.pending_questions.is_empty() {
            out.push_str("## Session State\n");
            for task in &session.current_tasks {
                let status = if task.done { "done" } else { "in progress" };
                out.push_str(&format!("- Task ({}): {}\n", status, task.description));
            }
            for question in &session.pending_questions {
                out.push_str(&format!(
                    "- Awaiting answer ({}): {}\n",
                    question.field, question.question
                ));
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }

    /// The most recent `limit` messages in chronological order, mapped to
    /// the neutral role shape. System messages are dropped.
    pub fn get_conversation_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> CoreResult<Vec<AiMessage>> {
        let mut rows = self.db.recent_chat_messages(session_id, limit)?;
        rows.reverse(); // stored newest-first
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let role = match row.role.as_str() {
                    "user" => MessageRole::User,
                    "assistant" => MessageRole::Assistant,
                    _ => return None,
                };
                Some(AiMessage {
                    role,
                    content: row.content,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;

    fn builder() -> (MemoryContextBuilder, Arc<InMemoryRepository>, Arc<SitewrightDb>) {
        let repo = Arc::new(InMemoryRepository::new());
        let db = Arc::new(SitewrightDb::open_in_memory().unwrap());
        (
            MemoryContextBuilder::new(repo.clone(), db.clone()),
            repo,
            db,
        )
    }

    #[tokio::test]
    async fn test_build_context_lazily_creates_tiers() {
        let (builder, repo, _db) = builder();
        let context = builder.build_context("u1", "p1", "s1").await.unwrap();
        assert_eq!(context.user.user_id, "u1");

        // The lazily created records are now durable
        assert!(repo.get_project("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_empty_tiers_render_nothing() {
        let (builder, _repo, _db) = builder();
        let context = builder.build_context("u1", "p1", "s1").await.unwrap();
        assert_eq!(MemoryContextBuilder::build_system_prompt_section(&context), "");
    }

    #[tokio::test]
    async fn test_sections_render_only_with_data() {
        let (builder, _repo, _db) = builder();
        let mut context = builder.build_context("u1", "p1", "s1").await.unwrap();
        context
            .user
            .style_preferences
            .insert("palette".to_string(), "dark, muted".to_string());
        context
            .session
            .upsert_pending_question("tagline", "Got a tagline?");

        let text = MemoryContextBuilder::build_system_prompt_section(&context);
        assert!(text.contains("## User Preferences"));
        assert!(text.contains("palette: dark, muted"));
        assert!(text.contains("## Session State"));
        assert!(!text.contains("## Project Context"));
    }

    #[tokio::test]
    async fn test_history_is_chronological_without_system() {
        let (builder, _repo, db) = builder();
        db.ensure_chat_session("s1", "p1").unwrap();
        db.append_chat_message("s1", "system", "internal note").unwrap();
        db.append_chat_message("s1", "user", "make it blue").unwrap();
        db.append_chat_message("s1", "assistant", "done").unwrap();

        let history = builder.get_conversation_history("s1", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "make it blue");
        assert_eq!(history[1].role, MessageRole::Assistant);
    }
}
