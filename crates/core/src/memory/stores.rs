//! # Memory Stores
//!
//! The three memory tiers (user / project / session) and the repository
//! seam they are persisted through. Records are lazily created and carry
//! an optimistic version counter; concurrent writers lose with
//! `StaleVersion` instead of silently clobbering each other.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::pipeline::SetupStep;
use crate::state::{MemoryTier, SitewrightDb};

const USER_DECISION_CAP: usize = 100;
const DESIGN_DECISION_CAP: usize = 50;
const CONTENT_HISTORY_CAP: usize = 20;

/// A record together with its persistence version.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub record: T,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub at: DateTime<Utc>,
    pub decision: String,
}

/// Durable per-user context: how this person likes their sites to look
/// and how they tend to phrase things.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserMemory {
    pub user_id: String,
    #[serde(default)]
    pub style_preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub business_context: Option<String>,
    #[serde(default)]
    pub interaction_patterns: Vec<String>,
    /// Bounded ring: only the most recent entries are kept
    #[serde(default)]
    pub decision_history: Vec<DecisionRecord>,
}

impl UserMemory {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn record_decision(&mut self, decision: impl Into<String>) {
        self.decision_history.push(DecisionRecord {
            at: Utc::now(),
            decision: decision.into(),
        });
        if self.decision_history.len() > USER_DECISION_CAP {
            let drop = self.decision_history.len() - USER_DECISION_CAP;
            self.decision_history.drain(..drop);
        }
    }
}

/// Durable per-project context accumulated across sessions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectMemory {
    pub project_id: String,
    #[serde(default)]
    pub business_details: BTreeMap<String, String>,
    #[serde(default)]
    pub design_decisions: Vec<DecisionRecord>,
    /// Prior content per section id, newest last
    #[serde(default)]
    pub content_history: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub generated_content_cache: BTreeMap<String, String>,
    #[serde(default)]
    pub site_goals: Vec<String>,
    #[serde(default)]
    pub discovered_info: BTreeMap<String, String>,
}

impl ProjectMemory {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn record_design_decision(&mut self, decision: impl Into<String>) {
        self.design_decisions.push(DecisionRecord {
            at: Utc::now(),
            decision: decision.into(),
        });
        if self.design_decisions.len() > DESIGN_DECISION_CAP {
            let drop = self.design_decisions.len() - DESIGN_DECISION_CAP;
            self.design_decisions.drain(..drop);
        }
    }

    pub fn push_content_history(&mut self, section_id: &str, content: impl Into<String>) {
        let history = self.content_history.entry(section_id.to_string()).or_default();
        history.push(content.into());
        if history.len() > CONTENT_HISTORY_CAP {
            let drop = history.len() - CONTENT_HISTORY_CAP;
            history.drain(..drop);
        }
    }
}

/// A question the assistant still owes the user an answer slot for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub field: String,
    pub question: String,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub done: bool,
}

/// Onboarding progress snapshot, written ahead of every input so a
/// session can resume mid-pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WipState {
    pub current_step: SetupStep,
    #[serde(default)]
    pub partial_data: BTreeMap<String, String>,
}

/// Short-lived per-session context.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionMemory {
    pub session_id: String,
    #[serde(default)]
    pub current_tasks: Vec<TaskRecord>,
    /// Unique per field; re-asking updates the existing entry
    #[serde(default)]
    pub pending_questions: Vec<PendingQuestion>,
    #[serde(default)]
    pub wip_state: Option<WipState>,
}

impl SessionMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Register a question for `field` at most once.
    pub fn upsert_pending_question(&mut self, field: &str, question: impl Into<String>) {
        match self.pending_questions.iter_mut().find(|q| q.field == field) {
            Some(existing) => existing.question = question.into(),
            None => self.pending_questions.push(PendingQuestion {
                field: field.to_string(),
                question: question.into(),
                asked_at: Utc::now(),
            }),
        }
    }

    /// Drop the pending question for `field`, if any. Returns whether one
    /// existed.
    pub fn resolve_question(&mut self, field: &str) -> bool {
        let before = self.pending_questions.len();
        self.pending_questions.retain(|q| q.field != field);
        self.pending_questions.len() < before
    }
}

/// Explicit repository seam for the three tiers. Absence is an explicit
/// `None`, creation is explicit `get_or_create`, and updates are
/// compare-and-set against the version read.
#[async_trait::async_trait]
pub trait MemoryRepository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> CoreResult<Option<Versioned<UserMemory>>>;
    async fn get_or_create_user(&self, user_id: &str) -> CoreResult<Versioned<UserMemory>>;
    async fn update_user(&self, record: &UserMemory, expected_version: i64) -> CoreResult<i64>;

    async fn get_project(&self, project_id: &str) -> CoreResult<Option<Versioned<ProjectMemory>>>;
    async fn get_or_create_project(&self, project_id: &str) -> CoreResult<Versioned<ProjectMemory>>;
    async fn update_project(
        &self,
        record: &ProjectMemory,
        expected_version: i64,
    ) -> CoreResult<i64>;

    async fn get_session(&self, session_id: &str) -> CoreResult<Option<Versioned<SessionMemory>>>;
    async fn get_or_create_session(&self, session_id: &str) -> CoreResult<Versioned<SessionMemory>>;
    async fn update_session(
        &self,
        record: &SessionMemory,
        expected_version: i64,
    ) -> CoreResult<i64>;
}

/// Read-modify-write with a bounded retry against version conflicts.
pub async fn modify_session<F>(
    repo: &dyn MemoryRepository,
    session_id: &str,
    mut apply: F,
) -> CoreResult<SessionMemory>
where
    F: FnMut(&mut SessionMemory),
{
    for _ in 0..3 {
        let mut current = repo.get_or_create_session(session_id).await?;
        apply(&mut current.record);
        match repo.update_session(&current.record, current.version).await {
            Ok(_) => return Ok(current.record),
            Err(CoreError::StaleVersion { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(CoreError::StaleVersion {
        record: format!("session:{}", session_id),
        expected: 0,
        found: 0,
    })
}

/// Read-modify-write for project memory, with the same bounded retry.
pub async fn modify_project<F>(
    repo: &dyn MemoryRepository,
    project_id: &str,
    mut apply: F,
) -> CoreResult<ProjectMemory>
where
    F: FnMut(&mut ProjectMemory),
{
    for _ in 0..3 {
        let mut current = repo.get_or_create_project(project_id).await?;
        apply(&mut current.record);
        match repo.update_project(&current.record, current.version).await {
            Ok(_) => return Ok(current.record),
            Err(CoreError::StaleVersion { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(CoreError::StaleVersion {
        record: format!("project:{}", project_id),
        expected: 0,
        found: 0,
    })
}

// === SQLite implementation ===

pub struct SqliteMemoryRepository {
    db: Arc<SitewrightDb>,
}

impl SqliteMemoryRepository {
    pub fn new(db: Arc<SitewrightDb>) -> Self {
        Self { db }
    }

    fn load<T: serde::de::DeserializeOwned>(
        &self,
        tier: MemoryTier,
        key: &str,
    ) -> CoreResult<Option<Versioned<T>>> {
        let row = self.db.get_memory(tier, key)?;
        match row {
            Some(row) => {
                let record = serde_json::from_str(&row.data)
                    .map_err(|e| CoreError::Storage(anyhow::anyhow!(e)))?;
                Ok(Some(Versioned {
                    record,
                    version: row.version,
                }))
            }
            None => Ok(None),
        }
    }

    fn create<T: Serialize>(&self, tier: MemoryTier, key: &str, record: &T) -> CoreResult<()> {
        let data = serde_json::to_string(record)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!(e)))?;
        self.db.insert_memory(tier, key, &data)?;
        Ok(())
    }

    fn save<T: Serialize>(
        &self,
        tier: MemoryTier,
        key: &str,
        record: &T,
        expected_version: i64,
    ) -> CoreResult<i64> {
        let data = serde_json::to_string(record)
            .map_err(|e| CoreError::Storage(anyhow::anyhow!(e)))?;
        match self.db.update_memory(tier, key, &data, expected_version)? {
            Some(version) => Ok(version),
            None => {
                let found = self
                    .db
                    .get_memory(tier, key)?
                    .map(|row| row.version)
                    .unwrap_or(0);
                Err(CoreError::StaleVersion {
                    record: format!("{:?}:{}", tier, key),
                    expected: expected_version,
                    found,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl MemoryRepository for SqliteMemoryRepository {
    async fn get_user(&self, user_id: &str) -> CoreResult<Option<Versioned<UserMemory>>> {
        self.load(MemoryTier::User, user_id)
    }

    async fn get_or_create_user(&self, user_id: &str) -> CoreResult<Versioned<UserMemory>> {
        if let Some(existing) = self.load(MemoryTier::User, user_id)? {
            return Ok(existing);
        }
        let record = UserMemory::new(user_id);
        self.create(MemoryTier::User, user_id, &record)?;
        Ok(Versioned { record, version: 1 })
    }

    async fn update_user(&self, record: &UserMemory, expected_version: i64) -> CoreResult<i64> {
        self.save(MemoryTier::User, &record.user_id, record, expected_version)
    }

    async fn get_project(&self, project_id: &str) -> CoreResult<Option<Versioned<ProjectMemory>>> {
        self.load(MemoryTier::Project, project_id)
    }

    async fn get_or_create_project(
        &self,
        project_id: &str,
    ) -> CoreResult<Versioned<ProjectMemory>> {
        if let Some(existing) = self.load(MemoryTier::Project, project_id)? {
            return Ok(existing);
        }
        let record = ProjectMemory::new(project_id);
        self.create(MemoryTier::Project, project_id, &record)?;
        Ok(Versioned { record, version: 1 })
    }

    async fn update_project(
        &self,
        record: &ProjectMemory,
        expected_version: i64,
    ) -> CoreResult<i64> {
        self.save(
            MemoryTier::Project,
            &record.project_id,
            record,
            expected_version,
        )
    }

    async fn get_session(&self, session_id: &str) -> CoreResult<Option<Versioned<SessionMemory>>> {
        self.load(MemoryTier::Session, session_id)
    }

    async fn get_or_create_session(
        &self,
        session_id: &str,
    ) -> CoreResult<Versioned<SessionMemory>> {
        if let Some(existing) = self.load(MemoryTier::Session, session_id)? {
            return Ok(existing);
        }
        let record = SessionMemory::new(session_id);
        self.create(MemoryTier::Session, session_id, &record)?;
        Ok(Versioned { record, version: 1 })
    }

    async fn update_session(
        &self,
        record: &SessionMemory,
        expected_version: i64,
    ) -> CoreResult<i64> {
        self.save(
            MemoryTier::Session,
            &record.session_id,
            record,
            expected_version,
        )
    }
}

// === In-memory implementation (tests, ephemeral sessions) ===

#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<HashMap<String, (UserMemory, i64)>>,
    projects: Mutex<HashMap<String, (ProjectMemory, i64)>>,
    sessions: Mutex<HashMap<String, (SessionMemory, i64)>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn map_get<T: Clone>(map: &Mutex<HashMap<String, (T, i64)>>, key: &str) -> Option<Versioned<T>> {
    map.lock()
        .ok()?
        .get(key)
        .map(|(record, version)| Versioned {
            record: record.clone(),
            version: *version,
        })
}

fn map_update<T: Clone>(
    map: &Mutex<HashMap<String, (T, i64)>>,
    key: &str,
    record: &T,
    expected_version: i64,
    label: &str,
) -> CoreResult<i64> {
    let mut guard = map
        .lock()
        .map_err(|e| CoreError::Storage(anyhow::anyhow!("lock error: {}", e)))?;
    let entry = guard
        .get_mut(key)
        .ok_or_else(|| CoreError::not_found("memory record", key))?;
    if entry.1 != expected_version {
        return Err(CoreError::StaleVersion {
            record: format!("{}:{}", label, key),
            expected: expected_version,
            found: entry.1,
        });
    }
    entry.0 = record.clone();
    entry.1 += 1;
    Ok(entry.1)
}

#[async_trait::async_trait]
impl MemoryRepository for InMemoryRepository {
    async fn get_user(&self, user_id: &str) -> CoreResult<Option<Versioned<UserMemory>>> {
        Ok(map_get(&self.users, user_id))
    }

    async fn get_or_create_user(&self, user_id: &str) -> CoreResult<Versioned<UserMemory>> {
        if let Some(existing) = map_get(&self.users, user_id) {
            return Ok(existing);
        }
        let record = UserMemory::new(user_id);
        self.users
            .lock()
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("lock error: {}", e)))?
            .insert(user_id.to_string(), (record.clone(), 1));
        Ok(Versioned { record, version: 1 })
    }

    async fn update_user(&self, record: &UserMemory, expected_version: i64) -> CoreResult<i64> {
        map_update(&self.users, &record.user_id, record, expected_version, "user")
    }

    async fn get_project(&self, project_id: &str) -> CoreResult<Option<Versioned<ProjectMemory>>> {
        Ok(map_get(&self.projects, project_id))
    }

    async fn get_or_create_project(
        &self,
        project_id: &str,
    ) -> CoreResult<Versioned<ProjectMemory>> {
        if let Some(existing) = map_get(&self.projects, project_id) {
            return Ok(existing);
        }
        let record = ProjectMemory::new(project_id);
        self.projects
            .lock()
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("lock error: {}", e)))?
            .insert(project_id.to_string(), (record.clone(), 1));
        Ok(Versioned { record, version: 1 })
    }

    async fn update_project(
        &self,
        record: &ProjectMemory,
        expected_version: i64,
    ) -> CoreResult<i64> {
        map_update(
            &self.projects,
            &record.project_id,
            record,
            expected_version,
            "project",
        )
    }

    async fn get_session(&self, session_id: &str) -> CoreResult<Option<Versioned<SessionMemory>>> {
        Ok(map_get(&self.sessions, session_id))
    }

    async fn get_or_create_session(
        &self,
        session_id: &str,
    ) -> CoreResult<Versioned<SessionMemory>> {
        if let Some(existing) = map_get(&self.sessions, session_id) {
            return Ok(existing);
        }
        let record = SessionMemory::new(session_id);
        self.sessions
            .lock()
            .map_err(|e| CoreError::Storage(anyhow::anyhow!("lock error: {}", e)))?
            .insert(session_id.to_string(), (record.clone(), 1));
        Ok(Versioned { record, version: 1 })
    }

    async fn update_session(
        &self,
        record: &SessionMemory,
        expected_version: i64,
    ) -> CoreResult<i64> {
        map_update(
            &self.sessions,
            &record.session_id,
            record,
            expected_version,
            "session",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_history_is_bounded() {
        let mut memory = UserMemory::new("u1");
        for i in 0..120 {
            memory.record_decision(format!("decision {}", i));
        }
        assert_eq!(memory.decision_history.len(), 100);
        assert_eq!(memory.decision_history[0].decision, "decision 20");
        assert_eq!(memory.decision_history[99].decision, "decision 119");
    }

    #[test]
    fn test_content_history_bounded_per_section() {
        let mut memory = ProjectMemory::new("p1");
        for i in 0..25 {
            memory.push_content_history("hero", format!("v{}", i));
        }
        memory.push_content_history("about", "only one");
        assert_eq!(memory.content_history["hero"].len(), 20);
        assert_eq!(memory.content_history["hero"][0], "v5");
        assert_eq!(memory.content_history["about"].len(), 1);
    }

    #[test]
    fn test_pending_questions_unique_by_field() {
        let mut session = SessionMemory::new("s1");
        session.upsert_pending_question("business_name", "What is the business called?");
        session.upsert_pending_question("business_name", "What should we call it?");
        session.upsert_pending_question("primary_color", "Favorite color?");

        assert_eq!(session.pending_questions.len(), 2);
        assert_eq!(
            session.pending_questions[0].question,
            "What should we call it?"
        );

        assert!(session.resolve_question("business_name"));
        assert!(!session.resolve_question("business_name"));
        assert_eq!(session.pending_questions.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_repository_get_or_create_and_cas() {
        let db = Arc::new(SitewrightDb::open_in_memory().unwrap());
        let repo = SqliteMemoryRepository::new(db);

        assert!(repo.get_user("u1").await.unwrap().is_none());
        let created = repo.get_or_create_user("u1").await.unwrap();
        assert_eq!(created.version, 1);

        let mut record = created.record;
        record.record_decision("prefers dark palettes");
        let v2 = repo.update_user(&record, 1).await.unwrap();
        assert_eq!(v2, 2);

        // Second writer with the stale version loses
        let err = repo.update_user(&record, 1).await.unwrap_err();
        assert!(matches!(err, CoreError::StaleVersion { .. }));
    }

    #[tokio::test]
    async fn test_modify_session_retries_conflicts() {
        let repo = InMemoryRepository::new();
        repo.get_or_create_session("s1").await.unwrap();

        let updated = modify_session(&repo, "s1", |session| {
            session.upsert_pending_question("tagline", "Got a tagline?");
        })
        .await
        .unwrap();
        assert_eq!(updated.pending_questions.len(), 1);

        let stored = repo.get_session("s1").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }
}
